use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode};
use chrono::Utc;

use services::SessionService;
use util::state::AppState;

use super::common::SessionResponse;
use crate::auth::AuthUser;
use crate::auth::guards::can_manage_class;
use crate::response::ApiResponse;
use crate::routes::common::error_status;

/// POST /api/classes/{class_id}/sessions
///
/// Starts (or reactivates) today's attendance session for the class, with
/// the caller as the session teacher.
pub async fn start_session(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Option<SessionResponse>>>) {
    let db = state.db();

    if !can_manage_class(db, &claims, class_id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only the class teacher or an admin may start a session",
            )),
        );
    }

    match SessionService::start(db, class_id, claims.sub, Utc::now()).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(session.into()),
                "Attendance session active",
            )),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
