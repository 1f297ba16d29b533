use sea_orm::DbErr;
use thiserror::Error;

/// Error kinds surfaced by the attendance core.
///
/// Every kind is returned to the calling layer; nothing here is
/// logged-and-swallowed except per-recipient delivery failures inside the
/// absence sweep fan-out, which the sweep handles itself.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// The token string cannot be decoded back into its triple shape.
    #[error("malformed token")]
    MalformedToken,

    /// Session missing, ended, or past its end time.
    #[error("session expired or not found")]
    SessionExpiredOrNotFound,

    /// Token secret does not match the session's current secret.
    #[error("invalid token")]
    InvalidToken,

    /// The student is already recorded as present; benign for callers.
    #[error("attendance already recorded as present")]
    AlreadyPresent,

    /// A session's one-shot extension was re-attempted.
    #[error("session has already been extended")]
    AlreadyExtended,

    #[error("not found")]
    NotFound,

    /// Verification submitted by a student not enrolled in the class.
    #[error("student is not enrolled in this class")]
    NotEnrolled,

    /// A concurrent write lost a race after the internal retry.
    #[error("concurrent write conflict")]
    StorageConflict,

    /// Manual override away from the automatic outcome needs a reason.
    #[error("a review reason is required when overriding the automatic outcome")]
    ReasonRequired,

    /// Photo persistence failed; fatal to the verification submission.
    #[error("failed to store check-in photo: {0}")]
    PhotoStorage(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] DbErr),
}
