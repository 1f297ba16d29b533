use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Deserialize;

use util::state::AppState;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::services::absence::run_absence_sweep;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SweepReq {
    /// Restrict the sweep to one teacher's sessions. Admin only; other
    /// callers always sweep their own sessions.
    pub teacher_id: Option<i64>,
}

/// POST /api/sweep
///
/// Triggers an on-demand absence notification sweep. Mail fan-out runs in
/// the background; the request returns as soon as the sweep is queued.
/// On-demand sweeps never consume a session's one-shot scheduled flag.
pub async fn trigger_sweep(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<SweepReq>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    let target = if claims.admin {
        req.teacher_id
    } else {
        Some(claims.sub)
    };

    let db = state.db_clone();
    tokio::spawn(async move {
        run_absence_sweep(db, target).await;
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success((), "Absence sweep queued")),
    )
}
