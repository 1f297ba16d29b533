use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use services::{SessionService, token::ROTATION_INTERVAL_SECS};
use util::state::AppState;

use super::common::{SessionAccess, load_managed_session};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_status;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub rotation_seconds: i64,
}

/// GET /api/classes/{class_id}/sessions/{session_id}/token
///
/// Mints the current rotating QR token. The teacher display re-polls this
/// every `rotation_seconds`.
pub async fn current_token(
    State(state): State<AppState>,
    Path((class_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Option<TokenResponse>>>) {
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
                    "Only the class teacher or an admin may display session tokens",
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

    match SessionService::mint_token(db, session_id, Utc::now()).await {
        Ok(token) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(TokenResponse {
                    token,
                    rotation_seconds: ROTATION_INTERVAL_SECS,
                }),
                "Current session token",
            )),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
