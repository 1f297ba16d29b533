mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use tower::util::ServiceExt;

use helpers::{create_class_with_teacher, create_user, enroll, make_test_app, request, response_json};

#[tokio::test]
async fn health_check_is_public() {
    let (app, _db) = make_test_app().await;

    let response = app
        .oneshot(request("GET", "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_routes_require_auth() {
    let (app, _db) = make_test_app().await;

    let response = app
        .oneshot(request("POST", "/api/classes/1/sessions", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_checkin_flow() {
    let (app, db) = make_test_app().await;
    let teacher = create_user(&db, "lecturer", false).await;
    let student = create_user(&db, "student", false).await;
    let class = create_class_with_teacher(&db, "CS201", &teacher).await;
    enroll(&db, &student, class.id).await;

    // teacher starts the session
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/classes/{}/sessions", class.id),
            Some(&teacher.token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "active");
    let session_id = body["data"]["id"].as_i64().unwrap();

    // teacher display fetches the current token
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/classes/{}/sessions/{}/token", class.id, session_id),
            Some(&teacher.token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_owned();
    assert_eq!(body["data"]["rotation_seconds"], 10);

    // student scans
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/checkins/scan",
            Some(&student.token),
            Some(json!({ "token": token })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "pending");

    // student passes liveness
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/checkins/verify",
            Some(&student.token),
            Some(json!({ "token": token, "liveness_confirmed": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "present");

    // re-verifying while present is a success-shaped no-op
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/checkins/verify",
            Some(&student.token),
            Some(json!({ "token": token, "liveness_confirmed": false })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());

    // one extension is allowed, the second conflicts
    let extend_uri = format!("/api/classes/{}/sessions/{}/extend", class.id, session_id);
    let response = app
        .clone()
        .oneshot(request("PUT", &extend_uri, Some(&teacher.token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["extended"], true);

    let response = app
        .clone()
        .oneshot(request("PUT", &extend_uri, Some(&teacher.token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // ending is idempotent at the HTTP level too
    let end_uri = format!("/api/classes/{}/sessions/{}/end", class.id, session_id);
    let response = app
        .clone()
        .oneshot(request("PUT", &end_uri, Some(&teacher.token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "ended");

    let response = app
        .oneshot(request("PUT", &end_uri, Some(&teacher.token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_teacher_cannot_manage_sessions() {
    let (app, db) = make_test_app().await;
    let teacher = create_user(&db, "lecturer", false).await;
    let student = create_user(&db, "student", false).await;
    let class = create_class_with_teacher(&db, "CS201", &teacher).await;
    enroll(&db, &student, class.id).await;

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/classes/{}/sessions", class.id),
            Some(&student.token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unenrolled_student_gets_forbidden_on_verify() {
    let (app, db) = make_test_app().await;
    let teacher = create_user(&db, "lecturer", false).await;
    let outsider = create_user(&db, "outsider", false).await;
    let class = create_class_with_teacher(&db, "CS201", &teacher).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/classes/{}/sessions", class.id),
            Some(&teacher.token),
            None,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let session_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/classes/{}/sessions/{}/token", class.id, session_id),
            Some(&teacher.token),
            None,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_owned();

    let response = app
        .oneshot(request(
            "POST",
            "/api/checkins/verify",
            Some(&outsider.token),
            Some(json!({ "token": token, "liveness_confirmed": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_token_is_bad_request() {
    let (app, db) = make_test_app().await;
    let student = create_user(&db, "student", false).await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/checkins/scan",
            Some(&student.token),
            Some(json!({ "token": "!!not-a-token!!" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn override_requires_reason_when_contradicting() {
    let (app, db) = make_test_app().await;
    let teacher = create_user(&db, "lecturer", false).await;
    let student = create_user(&db, "student", false).await;
    let class = create_class_with_teacher(&db, "CS201", &teacher).await;
    enroll(&db, &student, class.id).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/classes/{}/sessions", class.id),
            Some(&teacher.token),
            None,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let session_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/classes/{}/sessions/{}/token", class.id, session_id),
            Some(&teacher.token),
            None,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_owned();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/checkins/verify",
            Some(&student.token),
            Some(json!({ "token": token, "liveness_confirmed": true })),
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let record_id = body["data"]["id"].as_i64().unwrap();

    // present -> rejected contradicts the automatic outcome, reason required
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/checkins/{record_id}"),
            Some(&teacher.token),
            Some(json!({ "status": "rejected" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/checkins/{record_id}"),
            Some(&teacher.token),
            Some(json!({ "status": "rejected", "reason": "photo mismatch" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["reviewed_by"], teacher.id);

    // a student has no authority over the record
    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/checkins/{record_id}"),
            Some(&student.token),
            Some(json!({ "status": "present", "reason": "please" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sweep_trigger_is_accepted() {
    let (app, db) = make_test_app().await;
    let teacher = create_user(&db, "lecturer", false).await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/sweep",
            Some(&teacher.token),
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}
