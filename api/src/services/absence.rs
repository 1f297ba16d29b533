//! Absence sweep orchestration: session selection and absentee computation
//! come from `services::sweep`; this module runs the mail fan-out and the
//! once-only bookkeeping.

use chrono::Utc;
use db::models::class::Entity as ClassEntity;
use sea_orm::{DatabaseConnection, EntityTrait};
use services::sweep::SweepService;
use util::config;

use crate::services::email::EmailService;

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct SweepOutcome {
    pub sessions_processed: usize,
    pub notices_sent: usize,
    pub delivery_failures: usize,
}

/// Runs one absence sweep.
///
/// `teacher_id == None` is the scheduled variant: it honors and sets the
/// `notifications_sent` flag. `Some(id)` is the on-demand teacher-triggered
/// variant, which ignores the flag and may re-send.
///
/// Per-recipient delivery failures are logged and skipped, never retried
/// within the same sweep; a failed session simply stays unmarked and the
/// next scheduled sweep picks it up again.
pub async fn run_absence_sweep(db: DatabaseConnection, teacher_id: Option<i64>) -> SweepOutcome {
    let now = Utc::now();
    let scheduled = teacher_id.is_none();
    let mut outcome = SweepOutcome::default();

    let sessions =
        match SweepService::eligible_sessions(&db, teacher_id, now, config::sweep_window_hours())
            .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!(error = %e, "absence sweep could not list sessions");
                return outcome;
            }
        };

    for session in sessions {
        let absentees = match SweepService::absentees(&db, &session).await {
            Ok(absentees) => absentees,
            Err(e) => {
                tracing::warn!(error = %e, session_id = session.id, "skipping session in sweep");
                continue;
            }
        };

        let class_code = match ClassEntity::find_by_id(session.class_id).one(&db).await {
            Ok(Some(class)) => class.code,
            _ => format!("class {}", session.class_id),
        };

        for student in &absentees {
            match EmailService::send_absence_email(
                &student.email,
                &student.username,
                &class_code,
                session.session_day,
            )
            .await
            {
                Ok(()) => outcome.notices_sent += 1,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        session_id = session.id,
                        student_id = student.id,
                        "absence notice delivery failed; continuing"
                    );
                    outcome.delivery_failures += 1;
                }
            }
        }

        if scheduled {
            if let Err(e) = SweepService::mark_notified(&db, session.id, now).await {
                tracing::warn!(error = %e, session_id = session.id, "failed to mark session notified");
            }
        }

        outcome.sessions_processed += 1;
    }

    tracing::info!(
        sessions = outcome.sessions_processed,
        sent = outcome.notices_sent,
        failed = outcome.delivery_failures,
        scheduled,
        "absence sweep complete"
    );
    outcome
}
