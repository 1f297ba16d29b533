use axum::http::StatusCode;
use services::AttendanceError;

/// Default HTTP status for each core error kind. Handlers special-case
/// `AlreadyPresent` (a success-equivalent) before falling back to this.
pub fn error_status(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::MalformedToken
        | AttendanceError::InvalidToken
        | AttendanceError::ReasonRequired => StatusCode::BAD_REQUEST,
        AttendanceError::SessionExpiredOrNotFound | AttendanceError::NotFound => {
            StatusCode::NOT_FOUND
        }
        AttendanceError::NotEnrolled => StatusCode::FORBIDDEN,
        AttendanceError::AlreadyExtended | AttendanceError::StorageConflict => {
            StatusCode::CONFLICT
        }
        AttendanceError::AlreadyPresent => StatusCode::OK,
        AttendanceError::PhotoStorage(_) | AttendanceError::Db(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
