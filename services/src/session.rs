//! Session lifecycle: create/reactivate, extend, end, token minting.

use chrono::{DateTime, Duration, Utc};
use db::models::{
    attendance_record::{self, AttendanceStatus},
    class_session::{self, Column as SessionCol, Entity as SessionEntity, SessionStatus},
    user_class_role::{Column as RoleColumn, Entity as RoleEntity, Role},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, SqlErr, TransactionTrait,
};

use crate::{error::AttendanceError, token};

/// Initial attendance window for a started (or reactivated) session.
pub const SESSION_WINDOW_SECS: i64 = 90;
/// Amount added by the one-shot extension.
pub const EXTENSION_SECS: i64 = 30;

pub struct SessionService;

impl SessionService {
    /// Starts attendance for a class: reactivates today's session if one
    /// exists, otherwise creates a fresh one and seeds an `absent` record
    /// for every currently enrolled student.
    ///
    /// The whole operation runs in one transaction, and a fresh insert that
    /// loses the same-day unique-index race falls back to reactivating the
    /// winner's row, so concurrent double-clicks never produce duplicates.
    pub async fn start(
        db: &DatabaseConnection,
        class_id: i64,
        teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model, AttendanceError> {
        let txn = db.begin().await?;

        let session = match Self::find_today(&txn, class_id, teacher_id, now).await? {
            Some(existing) => {
                tracing::info!(session_id = existing.id, class_id, "reactivating session");
                Self::reactivate(&txn, existing, now).await?
            }
            None => match Self::create_fresh(&txn, class_id, teacher_id, now).await {
                Ok(created) => {
                    tracing::info!(session_id = created.id, class_id, "created session");
                    created
                }
                Err(AttendanceError::StorageConflict) => {
                    // Lost the upsert race; the winner's row is today's singleton.
                    let existing = Self::find_today(&txn, class_id, teacher_id, now)
                        .await?
                        .ok_or(AttendanceError::StorageConflict)?;
                    Self::reactivate(&txn, existing, now).await?
                }
                Err(e) => return Err(e),
            },
        };

        txn.commit().await?;
        Ok(session)
    }

    /// One-shot extension: pushes `end_time` forward by 30 seconds.
    pub async fn extend(
        db: &DatabaseConnection,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model, AttendanceError> {
        let session = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        if session.extended {
            return Err(AttendanceError::AlreadyExtended);
        }

        let new_end = session.end_time + Duration::seconds(EXTENSION_SECS);
        let mut active = session.into_active_model();
        active.end_time = Set(new_end);
        active.extended = Set(true);
        active.updated_at = Set(now);
        Ok(active.update(db).await?)
    }

    /// Ends a session, clamping `end_time` down to now (never up).
    /// Ending an already-ended session is a no-op success.
    pub async fn end(
        db: &DatabaseConnection,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model, AttendanceError> {
        let session = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        if session.status == SessionStatus::Ended {
            return Ok(session);
        }

        let clamped = session.end_time.min(now);
        let mut active = session.into_active_model();
        active.status = Set(SessionStatus::Ended);
        active.end_time = Set(clamped);
        active.updated_at = Set(now);
        Ok(active.update(db).await?)
    }

    /// Mints the current rotating token for a live session. Re-polled by the
    /// teacher display every rotation interval.
    pub async fn mint_token(
        db: &DatabaseConnection,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, AttendanceError> {
        let session = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::SessionExpiredOrNotFound)?;

        if !session.is_live(now) {
            return Err(AttendanceError::SessionExpiredOrNotFound);
        }

        Ok(token::encode_token(session.id, &session.secret, now))
    }

    async fn find_today<C>(
        conn: &C,
        class_id: i64,
        teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<class_session::Model>, AttendanceError>
    where
        C: ConnectionTrait,
    {
        Ok(SessionEntity::find()
            .filter(SessionCol::ClassId.eq(class_id))
            .filter(SessionCol::TeacherId.eq(teacher_id))
            .filter(SessionCol::SessionDay.eq(now.date_naive()))
            .one(conn)
            .await?)
    }

    /// Reactivation: rotate the secret, reset status and the time window.
    /// Attendance records are left untouched.
    async fn reactivate<C>(
        conn: &C,
        existing: class_session::Model,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model, AttendanceError>
    where
        C: ConnectionTrait,
    {
        let mut active = existing.into_active_model();
        active.secret = Set(class_session::Model::generate_secret());
        active.status = Set(SessionStatus::Active);
        active.end_time = Set(now + Duration::seconds(SESSION_WINDOW_SECS));
        active.updated_at = Set(now);
        Ok(active.update(conn).await?)
    }

    async fn create_fresh<C>(
        conn: &C,
        class_id: i64,
        teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model, AttendanceError>
    where
        C: ConnectionTrait,
    {
        let active = class_session::ActiveModel {
            class_id: Set(class_id),
            teacher_id: Set(teacher_id),
            session_day: Set(now.date_naive()),
            start_time: Set(now),
            end_time: Set(now + Duration::seconds(SESSION_WINDOW_SECS)),
            extended: Set(false),
            secret: Set(class_session::Model::generate_secret()),
            status: Set(SessionStatus::Active),
            notifications_sent: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = match active.insert(conn).await {
            Ok(m) => m,
            Err(e) if is_unique_violation(&e) => return Err(AttendanceError::StorageConflict),
            Err(e) => return Err(e.into()),
        };

        // Seed an absent record for everyone enrolled right now. Students who
        // enroll later get a record created on their first scan instead.
        let enrolled: Vec<i64> = RoleEntity::find()
            .filter(RoleColumn::ClassId.eq(class_id))
            .filter(RoleColumn::Role.eq(Role::Student))
            .all(conn)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        let rows: Vec<attendance_record::ActiveModel> = enrolled
            .into_iter()
            .map(|student_id| attendance_record::ActiveModel {
                session_id: Set(created.id),
                student_id: Set(student_id),
                status: Set(AttendanceStatus::Absent),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
            .collect();

        attendance_record::Entity::insert_many(rows)
            .on_empty_do_nothing()
            .exec(conn)
            .await?;

        Ok(created)
    }
}

pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
