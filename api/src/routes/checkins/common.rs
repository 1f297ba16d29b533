use chrono::{DateTime, Utc};
use db::models::attendance_record::{self, AttendanceStatus};
use serde::Serialize;

/// Attendance record view returned from check-in and override endpoints.
/// Internal bookkeeping (photo path, hash chain) stays server-side.
#[derive(Debug, Serialize)]
pub struct AttendanceRecordResponse {
    pub id: i64,
    pub session_id: i64,
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub checkin_time: Option<DateTime<Utc>>,
    pub liveness_confirmed: Option<bool>,
    pub reviewed_by: Option<i64>,
    pub review_reason: Option<String>,
}

impl From<attendance_record::Model> for AttendanceRecordResponse {
    fn from(m: attendance_record::Model) -> Self {
        Self {
            id: m.id,
            session_id: m.session_id,
            student_id: m.student_id,
            status: m.status,
            checkin_time: m.checkin_time,
            liveness_confirmed: m.liveness_confirmed,
            reviewed_by: m.reviewed_by,
            review_reason: m.review_reason,
        }
    }
}
