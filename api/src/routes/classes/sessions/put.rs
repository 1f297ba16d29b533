use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode};
use chrono::Utc;

use services::SessionService;
use util::state::AppState;

use super::common::{SessionAccess, SessionResponse, load_managed_session};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_status;

/// PUT /api/classes/{class_id}/sessions/{session_id}/extend
pub async fn extend_session(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Option<SessionResponse>>>) {
    let db = state.db();

    match load_managed_session(db, &claims, class_id, session_id).await {
        Ok(SessionAccess::Ok(_)) => {}
        Ok(SessionAccess::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Session not found")),
            );
        }
        Ok(SessionAccess::Forbidden) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error(
                    "Only the class teacher or an admin may extend a session",
                )),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Failed to load session: {e}"))),
            );
        }
    }

    match SessionService::extend(db, session_id, Utc::now()).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(session.into()),
                "Session extended by 30 seconds",
            )),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// PUT /api/classes/{class_id}/sessions/{session_id}/end
pub async fn end_session(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Option<SessionResponse>>>) {
    let db = state.db();

    match load_managed_session(db, &claims, class_id, session_id).await {
        Ok(SessionAccess::Ok(_)) => {}
        Ok(SessionAccess::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Session not found")),
            );
        }
        Ok(SessionAccess::Forbidden) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error(
                    "Only the class teacher or an admin may end a session",
                )),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Failed to load session: {e}"))),
            );
        }
    }

    match SessionService::end(db, session_id, Utc::now()).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(session.into()), "Session ended")),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
