use axum::{Extension, Json, extract::State, http::StatusCode};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use serde::Deserialize;

use services::{AttendanceError, CheckInService};
use util::state::AppState;

use super::common::AttendanceRecordResponse;
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_status;

#[derive(Debug, Deserialize)]
pub struct ScanReq {
    pub token: String,
}

/// POST /api/checkins/scan
///
/// Acknowledges a QR scan for the calling student, moving their record to
/// `pending`. A student who is already `present` gets a 200 with no data.
pub async fn scan(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<ScanReq>,
) -> (
    StatusCode,
    Json<ApiResponse<Option<AttendanceRecordResponse>>>,
) {
    match CheckInService::acknowledge_scan(state.db(), &body.token, claims.sub, Utc::now()).await {
        Ok(rec) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(rec.into()), "Scan acknowledged")),
        ),
        Err(AttendanceError::AlreadyPresent) => (
            StatusCode::OK,
            Json(ApiResponse::success(None, "Already marked present")),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyReq {
    pub token: String,
    pub liveness_confirmed: bool,
    pub verification_score: Option<f64>,
    /// Optional check-in photo, base64 (standard alphabet).
    pub photo_base64: Option<String>,
}

/// POST /api/checkins/verify
///
/// Submits the liveness verification outcome for the calling student.
pub async fn verify(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<VerifyReq>,
) -> (
    StatusCode,
    Json<ApiResponse<Option<AttendanceRecordResponse>>>,
) {
    let photo_bytes = match body.photo_base64.as_deref() {
        Some(encoded) => match STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("photo_base64 is not valid base64")),
                );
            }
        },
        None => None,
    };

    match CheckInService::submit_verification(
        state.db(),
        &body.token,
        claims.sub,
        body.liveness_confirmed,
        body.verification_score,
        photo_bytes.as_deref(),
        Utc::now(),
    )
    .await
    {
        Ok(rec) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(rec.into()),
                "Verification recorded",
            )),
        ),
        Err(AttendanceError::AlreadyPresent) => (
            StatusCode::OK,
            Json(ApiResponse::success(None, "Already marked present")),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
