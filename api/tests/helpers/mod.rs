use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use db::{
    models::{class, user, user_class_role, user_class_role::Role},
    test_utils::setup_test_db,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use util::state::AppState;

/// Builds the API router over a fresh in-memory database.
///
/// The request-logging layer is deliberately left off so tests can drive the
/// router with `oneshot` without a connection address.
pub async fn make_test_app() -> (Router, DatabaseConnection) {
    let db = setup_test_db().await;
    let app = Router::new().nest("/api", api::routes::routes(AppState::new(db.clone())));
    (app, db)
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

pub async fn create_user(db: &DatabaseConnection, username: &str, admin: bool) -> TestUser {
    let u = user::Model::create(db, username, &format!("{username}@test.com"), admin)
        .await
        .unwrap();
    let (token, _) = api::auth::generate_jwt(u.id, admin);
    TestUser { id: u.id, token }
}

pub async fn create_class_with_teacher(
    db: &DatabaseConnection,
    code: &str,
    teacher: &TestUser,
) -> class::Model {
    let c = class::Model::create(db, code, "Test Class", vec![]).await.unwrap();
    user_class_role::Model::assign_user_to_class(db, teacher.id, c.id, Role::Teacher)
        .await
        .unwrap();
    c
}

pub async fn enroll(db: &DatabaseConnection, student: &TestUser, class_id: i64) {
    user_class_role::Model::assign_user_to_class(db, student.id, class_id, Role::Student)
        .await
        .unwrap();
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
