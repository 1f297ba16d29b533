use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode};
use serde::Deserialize;
use validator::Validate;

use db::models::{
    class::{self, ScheduleSlot},
    user_class_role::{self, Role},
};
use sea_orm::DbErr;
use util::state::AppState;

use crate::auth::AuthUser;
use crate::auth::guards::can_manage_class;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassReq {
    #[validate(length(min = 2, max = 32, message = "code must be 2-32 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 128, message = "title must be 1-128 characters"))]
    pub title: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

/// POST /api/classes (admin only, enforced by the route guard)
pub async fn create_class(
    State(state): State<AppState>,
    Json(body): Json<CreateClassReq>,
) -> (StatusCode, Json<ApiResponse<Option<class::Model>>>) {
    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Validation failed: {errors}"))),
        );
    }

    match class::Model::create(state.db(), &body.code, &body.title, body.schedule).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(created), "Class created")),
        ),
        Err(DbErr::Custom(m)) => (StatusCode::BAD_REQUEST, Json(ApiResponse::error(m))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create class: {e}"))),
        ),
    }
}

/// POST /api/classes/{class_id}/students/{user_id} (class teacher or admin)
pub async fn enroll_student(
    State(state): State<AppState>,
    Path((class_id, user_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    let db = state.db();

    if !can_manage_class(db, &claims, class_id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only the class teacher or an admin may enroll students",
            )),
        );
    }

    match user_class_role::Model::assign_user_to_class(db, user_id, class_id, Role::Student).await
    {
        Ok(_) => (
            StatusCode::CREATED,
            Json(ApiResponse::success((), "Student enrolled")),
        ),
        Err(e)
            if matches!(
                e.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) =>
        {
            (
                StatusCode::CONFLICT,
                Json(ApiResponse::error("User already assigned to this class")),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to enroll student: {e}"))),
        ),
    }
}
