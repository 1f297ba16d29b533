use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;

use db::models::{attendance_record, class_session};
use sea_orm::EntityTrait;
use services::CheckInService;
use util::state::AppState;

use super::common::AttendanceRecordResponse;
use crate::auth::AuthUser;
use crate::auth::guards::can_manage_class;
use crate::response::ApiResponse;
use crate::routes::common::error_status;

#[derive(Debug, Deserialize)]
pub struct OverrideReq {
    pub status: attendance_record::AttendanceStatus,
    pub reason: Option<String>,
}

/// PUT /api/checkins/{record_id}
///
/// Manual status override by the class teacher or an admin. A reason is
/// required whenever the new status contradicts the automatic outcome.
pub async fn override_status(
    State(state): State<AppState>,
    Path(record_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<OverrideReq>,
) -> (
    StatusCode,
    Json<ApiResponse<Option<AttendanceRecordResponse>>>,
) {
    let db = state.db();

    // Resolve the record's class before touching anything, so the caller's
    // authority is checked against the right class.
    let session = match attendance_record::Entity::find_by_id(record_id)
        .find_also_related(class_session::Entity)
        .one(db)
        .await
    {
        Ok(Some((_, Some(session)))) => session,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Attendance record not found")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Failed to load record: {e}"))),
            );
        }
    };

    if !can_manage_class(db, &claims, session.class_id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only the class teacher or an admin may override attendance",
            )),
        );
    }

    match CheckInService::override_status(
        db,
        record_id,
        body.status,
        claims.sub,
        body.reason.as_deref(),
        Utc::now(),
    )
    .await
    {
        Ok(rec) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(rec.into()),
                "Attendance status overridden",
            )),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
