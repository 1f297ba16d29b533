//! Verification decision engine.
//!
//! The shipped rule is a binary liveness gate: a confirmed-live check-in is
//! present, anything else goes to manual teacher review as pending. Nothing
//! is auto-rejected on this path; rejection is a reviewer decision.

use db::models::attendance_record::AttendanceStatus;

/// Computes the attendance status from the liveness signal.
pub fn decide(liveness_confirmed: bool) -> AttendanceStatus {
    if liveness_confirmed {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_gates_present() {
        assert_eq!(decide(true), AttendanceStatus::Present);
        assert_eq!(decide(false), AttendanceStatus::Pending);
    }
}
