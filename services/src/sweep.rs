//! Absence sweep data layer: which sessions are due for notices, who the
//! absentees are, and the once-only bookkeeping flag.
//!
//! Delivery itself (the mail fan-out) lives with the HTTP layer's email
//! service; this module only answers the questions and records completion.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use db::models::{
    attendance_record::{self, AttendanceStatus},
    class_session::{self, Column as SessionCol, Entity as SessionEntity},
    user::{self, Column as UserCol, Entity as UserEntity},
    user_class_role::{Column as RoleColumn, Entity as RoleEntity, Role},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

use crate::error::AttendanceError;

pub struct SweepService;

impl SweepService {
    /// Sessions whose window has elapsed within the trailing window.
    ///
    /// The scheduled variant (`teacher_id == None`) only returns sessions not
    /// yet marked `notifications_sent`; the on-demand teacher-triggered
    /// variant ignores the flag and may re-send.
    pub async fn eligible_sessions(
        db: &DatabaseConnection,
        teacher_id: Option<i64>,
        now: DateTime<Utc>,
        window_hours: i64,
    ) -> Result<Vec<class_session::Model>, AttendanceError> {
        // Strict lower bound: at exactly end_time a session is still live
        // (`is_live` uses `now <= end_time`) and must not be swept yet.
        let cutoff = now - Duration::hours(window_hours);
        let mut query = SessionEntity::find()
            .filter(SessionCol::EndTime.lt(now))
            .filter(SessionCol::EndTime.gt(cutoff));

        query = match teacher_id {
            Some(id) => query.filter(SessionCol::TeacherId.eq(id)),
            None => query.filter(SessionCol::NotificationsSent.eq(false)),
        };

        Ok(query.all(db).await?)
    }

    /// `absentees = enrolled(class) \ {students with status in {present, pending}}`.
    ///
    /// Pure function of stored state: re-computation without intervening
    /// record mutations yields the same set.
    pub async fn absentees(
        db: &DatabaseConnection,
        session: &class_session::Model,
    ) -> Result<Vec<user::Model>, AttendanceError> {
        let enrolled: Vec<i64> = RoleEntity::find()
            .filter(RoleColumn::ClassId.eq(session.class_id))
            .filter(RoleColumn::Role.eq(Role::Student))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        let covered: HashSet<i64> = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::Status.is_in([
                AttendanceStatus::Present,
                AttendanceStatus::Pending,
            ]))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.student_id)
            .collect();

        let absent_ids: Vec<i64> = enrolled
            .into_iter()
            .filter(|id| !covered.contains(id))
            .collect();
        if absent_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(UserEntity::find()
            .filter(UserCol::Id.is_in(absent_ids))
            .all(db)
            .await?)
    }

    /// Marks a session as notified; scheduled sweeps skip it from then on.
    pub async fn mark_notified(
        db: &DatabaseConnection,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), AttendanceError> {
        let session = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        let mut active = session.into_active_model();
        active.notifications_sent = Set(true);
        active.updated_at = Set(now);
        active.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::CheckInService;
    use crate::session::SessionService;
    use crate::token;
    use db::models::{class, user_class_role};
    use db::test_utils::setup_test_db;

    async fn seed_session_with_students(
        db: &DatabaseConnection,
        count: usize,
    ) -> (class_session::Model, Vec<user::Model>, DateTime<Utc>) {
        let teacher = user::Model::create(db, "sweep_teach", "sweep_teach@test.com", false)
            .await
            .unwrap();
        let c = class::Model::create(db, "CS301", "Algorithms", vec![])
            .await
            .unwrap();
        user_class_role::Model::assign_user_to_class(db, teacher.id, c.id, Role::Teacher)
            .await
            .unwrap();

        let mut students = Vec::new();
        for i in 0..count {
            let s = user::Model::create(
                db,
                &format!("sw{i}"),
                &format!("sw{i}@test.com"),
                false,
            )
            .await
            .unwrap();
            user_class_role::Model::assign_user_to_class(db, s.id, c.id, Role::Student)
                .await
                .unwrap();
            students.push(s);
        }

        let now = Utc::now();
        let session = SessionService::start(db, c.id, teacher.id, now)
            .await
            .unwrap();
        (session, students, now)
    }

    #[tokio::test]
    async fn absentee_set_excludes_present_and_pending() {
        let db = setup_test_db().await;
        let (session, students, now) = seed_session_with_students(&db, 3).await;
        let t = now + Duration::seconds(5);
        let tok = token::encode_token(session.id, &session.secret, t);

        // student 0 present, student 1 pending, student 2 never checks in
        CheckInService::submit_verification(&db, &tok, students[0].id, true, None, None, t)
            .await
            .unwrap();
        CheckInService::acknowledge_scan(&db, &tok, students[1].id, t)
            .await
            .unwrap();

        let absent = SweepService::absentees(&db, &session).await.unwrap();
        assert_eq!(absent.len(), 1);
        assert_eq!(absent[0].id, students[2].id);

        // deterministic under re-computation
        let again = SweepService::absentees(&db, &session).await.unwrap();
        assert_eq!(
            absent.iter().map(|u| u.id).collect::<Vec<_>>(),
            again.iter().map(|u| u.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn scheduled_sweep_skips_marked_sessions_but_on_demand_does_not() {
        let db = setup_test_db().await;
        let (session, _students, now) = seed_session_with_students(&db, 1).await;

        // session over
        SessionService::end(&db, session.id, now).await.unwrap();
        let later = now + Duration::seconds(10);

        let scheduled = SweepService::eligible_sessions(&db, None, later, 24)
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 1);

        SweepService::mark_notified(&db, session.id, later).await.unwrap();

        let scheduled = SweepService::eligible_sessions(&db, None, later, 24)
            .await
            .unwrap();
        assert!(scheduled.is_empty());

        // on-demand teacher sweep still sees it
        let on_demand =
            SweepService::eligible_sessions(&db, Some(session.teacher_id), later, 24)
                .await
                .unwrap();
        assert_eq!(on_demand.len(), 1);
    }

    #[tokio::test]
    async fn still_live_sessions_are_not_swept() {
        let db = setup_test_db().await;
        let (session, _students, now) = seed_session_with_students(&db, 1).await;

        // window not yet elapsed
        let eligible = SweepService::eligible_sessions(&db, None, now, 24)
            .await
            .unwrap();
        assert!(eligible.is_empty());

        // at exactly end_time the session is still live, so not yet swept
        let boundary = now + Duration::seconds(crate::session::SESSION_WINDOW_SECS);
        assert!(session.is_live(boundary));
        let eligible = SweepService::eligible_sessions(&db, None, boundary, 24)
            .await
            .unwrap();
        assert!(eligible.is_empty());

        // elapsed by time alone, never explicitly ended: still swept
        let later = now + Duration::seconds(crate::session::SESSION_WINDOW_SECS + 1);
        let eligible = SweepService::eligible_sessions(&db, None, later, 24)
            .await
            .unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, session.id);
    }

    #[tokio::test]
    async fn sessions_older_than_window_fall_out() {
        let db = setup_test_db().await;
        let (session, _students, now) = seed_session_with_students(&db, 1).await;
        SessionService::end(&db, session.id, now).await.unwrap();

        let much_later = now + Duration::hours(25);
        let eligible = SweepService::eligible_sessions(&db, None, much_later, 24)
            .await
            .unwrap();
        assert!(eligible.is_empty());
    }
}
