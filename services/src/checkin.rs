//! Check-in processing: scan acknowledgment, verification submission, and
//! manual override.
//!
//! State machine per (session, student): `NoRecord → Absent → Pending →
//! {Present | Rejected}`. `Present` is terminal for the automatic path; a
//! present student re-scanning gets the distinguished `AlreadyPresent`
//! outcome, which callers treat as success-equivalent.

use chrono::{DateTime, Utc};
use db::models::{
    attendance_record::{self, AttendanceStatus, Column as RecordCol, Entity as RecordEntity},
    class_session::{self, Entity as SessionEntity},
    user,
    user_class_role::Role,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sha2::{Digest, Sha256};

use crate::{decision, error::AttendanceError, photo, session::is_unique_violation, token};

pub struct CheckInService;

impl CheckInService {
    /// First stage of a check-in: the student's client acknowledges a QR
    /// scan. Flips (or creates) the record to `pending`.
    pub async fn acknowledge_scan(
        db: &DatabaseConnection,
        token_str: &str,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, AttendanceError> {
        let session = Self::validate_token_session(db, token_str, now).await?;
        Self::mark_pending(db, &session, student_id, now).await
    }

    /// Second stage: the student submits the liveness result (and optional
    /// photo). Fully re-validates the token and session; no state is carried
    /// over from the earlier scan acknowledgment.
    pub async fn submit_verification(
        db: &DatabaseConnection,
        token_str: &str,
        student_id: i64,
        liveness_confirmed: bool,
        verification_score: Option<f64>,
        photo_bytes: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, AttendanceError> {
        let session = Self::validate_token_session(db, token_str, now).await?;

        if !user::Model::is_in_role(db, student_id, session.class_id, Role::Student).await? {
            return Err(AttendanceError::NotEnrolled);
        }

        // Photo persistence failure is fatal to the whole submission.
        let photo_path = match photo_bytes {
            Some(bytes) => Some(photo::store_checkin_photo(session.id, student_id, bytes)?),
            None => None,
        };

        let status = decision::decide(liveness_confirmed);

        // The previous-hash read and the record write commit together, so
        // concurrent verifications chain one after the other rather than
        // both chaining to the same predecessor.
        let txn = db.begin().await?;
        let record = Self::finalize_record(
            &txn,
            &session,
            student_id,
            status,
            liveness_confirmed,
            verification_score,
            photo_path,
            now,
        )
        .await?;
        txn.commit().await?;
        Ok(record)
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize_record<C>(
        conn: &C,
        session: &class_session::Model,
        student_id: i64,
        status: AttendanceStatus,
        liveness_confirmed: bool,
        verification_score: Option<f64>,
        photo_path: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, AttendanceError>
    where
        C: ConnectionTrait,
    {
        let prev_hash = Self::latest_chain_hash(conn, session.id).await?;
        let record_hash = chain_hash(prev_hash.as_deref(), session.id, student_id, status, now);

        match Self::find_record(conn, session.id, student_id).await? {
            Some(rec) if rec.status == AttendanceStatus::Present => {
                Err(AttendanceError::AlreadyPresent)
            }
            Some(rec) => {
                let mut active = rec.into_active_model();
                active.status = Set(status);
                active.checkin_time = Set(Some(now));
                active.liveness_confirmed = Set(Some(liveness_confirmed));
                active.verification_score = Set(verification_score);
                active.photo_path = Set(photo_path);
                active.record_hash = Set(Some(record_hash));
                active.updated_at = Set(now);
                Ok(active.update(conn).await?)
            }
            None => {
                let active = attendance_record::ActiveModel {
                    session_id: Set(session.id),
                    student_id: Set(student_id),
                    status: Set(status),
                    checkin_time: Set(Some(now)),
                    liveness_confirmed: Set(Some(liveness_confirmed)),
                    verification_score: Set(verification_score),
                    photo_path: Set(photo_path.clone()),
                    record_hash: Set(Some(record_hash.clone())),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                match active.insert(conn).await {
                    Ok(rec) => Ok(rec),
                    Err(e) if is_unique_violation(&e) => {
                        // Benign race with a parallel acknowledgment; retry as
                        // a read-then-update, re-reading the chain head since
                        // the winner may have advanced it.
                        tracing::debug!(
                            session_id = session.id,
                            student_id,
                            "verification insert lost race, retrying as update"
                        );
                        let rec = Self::find_record(conn, session.id, student_id)
                            .await?
                            .ok_or(AttendanceError::StorageConflict)?;
                        if rec.status == AttendanceStatus::Present {
                            return Err(AttendanceError::AlreadyPresent);
                        }
                        let prev_hash = Self::latest_chain_hash(conn, session.id).await?;
                        let record_hash =
                            chain_hash(prev_hash.as_deref(), session.id, student_id, status, now);
                        let mut active = rec.into_active_model();
                        active.status = Set(status);
                        active.checkin_time = Set(Some(now));
                        active.liveness_confirmed = Set(Some(liveness_confirmed));
                        active.verification_score = Set(verification_score);
                        active.photo_path = Set(photo_path);
                        active.record_hash = Set(Some(record_hash));
                        active.updated_at = Set(now);
                        Ok(active.update(conn).await?)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Teacher/admin manual override. Permitted regardless of session state
    /// and fully overwrites the prior status; a reason is mandatory when the
    /// new status contradicts the automatic outcome.
    pub async fn override_status(
        db: &DatabaseConnection,
        record_id: i64,
        new_status: AttendanceStatus,
        reviewer_id: i64,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, AttendanceError> {
        let rec = RecordEntity::find_by_id(record_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        // Automatic outcome: the decision engine's verdict if verification
        // ran, otherwise the seeded absent state.
        let automatic = rec
            .liveness_confirmed
            .map(decision::decide)
            .unwrap_or(AttendanceStatus::Absent);
        if new_status != automatic && reason.is_none() {
            return Err(AttendanceError::ReasonRequired);
        }

        let mut active = rec.into_active_model();
        active.status = Set(new_status);
        active.reviewed_by = Set(Some(reviewer_id));
        active.review_reason = Set(reason.map(|s| s.to_owned()));
        active.updated_at = Set(now);
        Ok(active.update(db).await?)
    }

    /// Decodes the token, loads the session, and checks liveness and secret
    /// equality. The secret comparison is the authorization check; there is
    /// no bypass path.
    async fn validate_token_session(
        db: &DatabaseConnection,
        token_str: &str,
        now: DateTime<Utc>,
    ) -> Result<class_session::Model, AttendanceError> {
        let claims = token::decode_token(token_str)?;

        let session = SessionEntity::find_by_id(claims.session_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::SessionExpiredOrNotFound)?;

        if !session.is_live(now) {
            return Err(AttendanceError::SessionExpiredOrNotFound);
        }
        if claims.secret != session.secret {
            return Err(AttendanceError::InvalidToken);
        }
        Ok(session)
    }

    async fn mark_pending(
        db: &DatabaseConnection,
        session: &class_session::Model,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, AttendanceError> {
        match Self::find_record(db, session.id, student_id).await? {
            Some(rec) if rec.status == AttendanceStatus::Present => {
                Err(AttendanceError::AlreadyPresent)
            }
            Some(rec) => {
                let mut active = rec.into_active_model();
                active.status = Set(AttendanceStatus::Pending);
                active.checkin_time = Set(Some(now));
                active.updated_at = Set(now);
                Ok(active.update(db).await?)
            }
            // No seeded row: the student enrolled after session start (or the
            // record was lost); create it fresh.
            None => {
                let active = attendance_record::ActiveModel {
                    session_id: Set(session.id),
                    student_id: Set(student_id),
                    status: Set(AttendanceStatus::Pending),
                    checkin_time: Set(Some(now)),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                match active.insert(db).await {
                    Ok(rec) => Ok(rec),
                    Err(e) if is_unique_violation(&e) => {
                        let rec = Self::find_record(db, session.id, student_id)
                            .await?
                            .ok_or(AttendanceError::StorageConflict)?;
                        if rec.status == AttendanceStatus::Present {
                            return Err(AttendanceError::AlreadyPresent);
                        }
                        let mut active = rec.into_active_model();
                        active.status = Set(AttendanceStatus::Pending);
                        active.checkin_time = Set(Some(now));
                        active.updated_at = Set(now);
                        Ok(active.update(db).await?)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn find_record<C>(
        conn: &C,
        session_id: i64,
        student_id: i64,
    ) -> Result<Option<attendance_record::Model>, AttendanceError>
    where
        C: ConnectionTrait,
    {
        Ok(RecordEntity::find()
            .filter(RecordCol::SessionId.eq(session_id))
            .filter(RecordCol::StudentId.eq(student_id))
            .one(conn)
            .await?)
    }

    /// Most recently finalized hash in the session's chain, if any.
    async fn latest_chain_hash<C>(
        conn: &C,
        session_id: i64,
    ) -> Result<Option<String>, AttendanceError>
    where
        C: ConnectionTrait,
    {
        let latest = RecordEntity::find()
            .filter(RecordCol::SessionId.eq(session_id))
            .filter(RecordCol::RecordHash.is_not_null())
            .order_by_desc(RecordCol::CheckinTime)
            .order_by_desc(RecordCol::Id)
            .one(conn)
            .await?;
        Ok(latest.and_then(|r| r.record_hash))
    }
}

/// Hash over the previous chained hash plus this record's identifying fields.
fn chain_hash(
    prev: Option<&str>,
    session_id: i64,
    student_id: i64,
    status: AttendanceStatus,
    checkin_time: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev.unwrap_or("").as_bytes());
    hasher.update(
        format!(
            "|{}|{}|{}|{}",
            session_id,
            student_id,
            status,
            checkin_time.timestamp()
        )
        .as_bytes(),
    );
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionService;
    use chrono::Duration;
    use db::models::{class, user_class_role};
    use db::test_utils::setup_test_db;
    use sea_orm::PaginatorTrait;

    struct Ctx {
        class: class::Model,
        teacher: user::Model,
        student: user::Model,
        session: class_session::Model,
        now: DateTime<Utc>,
    }

    async fn setup(db: &DatabaseConnection) -> Ctx {
        let teacher = user::Model::create(db, "lect", "lect@test.com", false)
            .await
            .unwrap();
        let student = user::Model::create(db, "stud", "stud@test.com", false)
            .await
            .unwrap();
        let class = class::Model::create(db, "CS201", "Data Structures", vec![])
            .await
            .unwrap();
        user_class_role::Model::assign_user_to_class(db, teacher.id, class.id, Role::Teacher)
            .await
            .unwrap();
        user_class_role::Model::assign_user_to_class(db, student.id, class.id, Role::Student)
            .await
            .unwrap();

        let now = Utc::now();
        let session = SessionService::start(db, class.id, teacher.id, now)
            .await
            .unwrap();

        Ctx {
            class,
            teacher,
            student,
            session,
            now,
        }
    }

    fn mint(session: &class_session::Model, at: DateTime<Utc>) -> String {
        token::encode_token(session.id, &session.secret, at)
    }

    #[tokio::test]
    async fn scan_flips_absent_to_pending_and_is_stable_on_rescan() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(5);

        let rec = CheckInService::acknowledge_scan(&db, &mint(&ctx.session, t), ctx.student.id, t)
            .await
            .unwrap();
        assert_eq!(rec.status, AttendanceStatus::Pending);
        assert_eq!(rec.checkin_time, Some(t));

        // second scan with a freshly rotated token (same secret) touches the
        // same row, no duplicate
        let t2 = t + Duration::seconds(token::ROTATION_INTERVAL_SECS);
        let rec2 =
            CheckInService::acknowledge_scan(&db, &mint(&ctx.session, t2), ctx.student.id, t2)
                .await
                .unwrap();
        assert_eq!(rec2.id, rec.id);
        assert_eq!(rec2.status, AttendanceStatus::Pending);

        let count = RecordEntity::find()
            .filter(RecordCol::SessionId.eq(ctx.session.id))
            .filter(RecordCol::StudentId.eq(ctx.student.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn scan_creates_record_for_late_enrolled_student() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;

        // enrolled after session start, so no seeded row exists
        let late = user::Model::create(&db, "late", "late@test.com", false)
            .await
            .unwrap();
        user_class_role::Model::assign_user_to_class(&db, late.id, ctx.class.id, Role::Student)
            .await
            .unwrap();

        let t = ctx.now + Duration::seconds(10);
        let rec = CheckInService::acknowledge_scan(&db, &mint(&ctx.session, t), late.id, t)
            .await
            .unwrap();
        assert_eq!(rec.status, AttendanceStatus::Pending);
        assert_eq!(rec.student_id, late.id);
    }

    #[tokio::test]
    async fn malformed_and_wrong_secret_tokens_are_rejected() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(1);

        let err = CheckInService::acknowledge_scan(&db, "???", ctx.student.id, t)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::MalformedToken));

        let forged = token::encode_token(ctx.session.id, "wrong-secret", t);
        let err = CheckInService::acknowledge_scan(&db, &forged, ctx.student.id, t)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_session_rejects_scan() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;

        let late = ctx.now + Duration::seconds(crate::session::SESSION_WINDOW_SECS + 5);
        let err = CheckInService::acknowledge_scan(
            &db,
            &mint(&ctx.session, late),
            ctx.student.id,
            late,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::SessionExpiredOrNotFound));
    }

    #[tokio::test]
    async fn pre_reactivation_token_fails_after_restart() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(5);
        let old_token = mint(&ctx.session, t);

        // teacher restarts the session; secret rotates
        let reactivated = SessionService::start(&db, ctx.class.id, ctx.teacher.id, t)
            .await
            .unwrap();
        assert_ne!(reactivated.secret, ctx.session.secret);

        let err = CheckInService::submit_verification(
            &db,
            &old_token,
            ctx.student.id,
            true,
            None,
            None,
            t + Duration::seconds(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidToken));
    }

    #[tokio::test]
    async fn verification_with_liveness_marks_present_and_present_is_sticky() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(5);
        let tok = mint(&ctx.session, t);

        let rec = CheckInService::submit_verification(
            &db,
            &tok,
            ctx.student.id,
            true,
            Some(0.42),
            None,
            t,
        )
        .await
        .unwrap();
        assert_eq!(rec.status, AttendanceStatus::Present);
        assert_eq!(rec.liveness_confirmed, Some(true));
        assert_eq!(rec.verification_score, Some(0.42));
        assert!(rec.record_hash.is_some());

        // a later submission, even failing liveness, cannot demote present
        let t2 = t + Duration::seconds(3);
        let err = CheckInService::submit_verification(
            &db,
            &mint(&ctx.session, t2),
            ctx.student.id,
            false,
            None,
            None,
            t2,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyPresent));

        let reloaded = RecordEntity::find_by_id(rec.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.status, AttendanceStatus::Present);

        // re-scan of a present student is the distinguished no-op as well
        let err = CheckInService::acknowledge_scan(
            &db,
            &mint(&ctx.session, t2),
            ctx.student.id,
            t2,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyPresent));
    }

    #[tokio::test]
    async fn verification_without_liveness_goes_to_pending_review() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(5);

        let rec = CheckInService::submit_verification(
            &db,
            &mint(&ctx.session, t),
            ctx.student.id,
            false,
            None,
            None,
            t,
        )
        .await
        .unwrap();
        assert_eq!(rec.status, AttendanceStatus::Pending);
    }

    #[tokio::test]
    async fn unenrolled_student_cannot_verify() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let outsider = user::Model::create(&db, "other", "other@test.com", false)
            .await
            .unwrap();

        let t = ctx.now + Duration::seconds(5);
        let err = CheckInService::submit_verification(
            &db,
            &mint(&ctx.session, t),
            outsider.id,
            true,
            None,
            None,
            t,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::NotEnrolled));
    }

    #[tokio::test]
    async fn record_hashes_chain_across_verifications() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let second = user::Model::create(&db, "stud2", "stud2@test.com", false)
            .await
            .unwrap();
        user_class_role::Model::assign_user_to_class(&db, second.id, ctx.class.id, Role::Student)
            .await
            .unwrap();

        let t = ctx.now + Duration::seconds(2);
        let rec1 = CheckInService::submit_verification(
            &db,
            &mint(&ctx.session, t),
            ctx.student.id,
            true,
            None,
            None,
            t,
        )
        .await
        .unwrap();

        let t2 = t + Duration::seconds(4);
        let rec2 = CheckInService::submit_verification(
            &db,
            &mint(&ctx.session, t2),
            second.id,
            true,
            None,
            None,
            t2,
        )
        .await
        .unwrap();

        let expected = chain_hash(
            rec1.record_hash.as_deref(),
            ctx.session.id,
            second.id,
            AttendanceStatus::Present,
            t2,
        );
        assert_eq!(rec2.record_hash.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn simultaneous_verifications_form_a_single_chain() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let second = user::Model::create(&db, "stud2", "stud2@test.com", false)
            .await
            .unwrap();
        user_class_role::Model::assign_user_to_class(&db, second.id, ctx.class.id, Role::Student)
            .await
            .unwrap();

        let t = ctx.now + Duration::seconds(3);
        let tok = mint(&ctx.session, t);

        let (r1, r2) = tokio::join!(
            CheckInService::submit_verification(&db, &tok, ctx.student.id, true, None, None, t),
            CheckInService::submit_verification(&db, &tok, second.id, true, None, None, t),
        );
        let h1 = r1.unwrap().record_hash.unwrap();
        let h2 = r2.unwrap().record_hash.unwrap();

        // whichever order the writes landed in, the later one must chain to
        // the earlier one; never two genesis hashes
        let sid = ctx.session.id;
        let g1 = chain_hash(None, sid, ctx.student.id, AttendanceStatus::Present, t);
        let g2 = chain_hash(None, sid, second.id, AttendanceStatus::Present, t);
        let first_then_second = chain_hash(Some(&g1), sid, second.id, AttendanceStatus::Present, t);
        let second_then_first =
            chain_hash(Some(&g2), sid, ctx.student.id, AttendanceStatus::Present, t);

        assert!(
            (h1 == g1 && h2 == first_then_second) || (h2 == g2 && h1 == second_then_first),
            "records chained independently: h1={h1} h2={h2}"
        );
    }

    #[tokio::test]
    async fn override_requires_reason_when_contradicting_automatic_outcome() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(5);

        let rec = CheckInService::submit_verification(
            &db,
            &mint(&ctx.session, t),
            ctx.student.id,
            true,
            None,
            None,
            t,
        )
        .await
        .unwrap();

        // present -> rejected contradicts the automatic decision
        let err = CheckInService::override_status(
            &db,
            rec.id,
            AttendanceStatus::Rejected,
            ctx.teacher.id,
            None,
            t,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::ReasonRequired));

        let overridden = CheckInService::override_status(
            &db,
            rec.id,
            AttendanceStatus::Rejected,
            ctx.teacher.id,
            Some("photo does not match student"),
            t,
        )
        .await
        .unwrap();
        assert_eq!(overridden.status, AttendanceStatus::Rejected);
        assert_eq!(overridden.reviewed_by, Some(ctx.teacher.id));
    }

    #[tokio::test]
    async fn override_works_after_session_ended() {
        let db = setup_test_db().await;
        let ctx = setup(&db).await;
        let t = ctx.now + Duration::seconds(5);

        let rec = CheckInService::acknowledge_scan(
            &db,
            &mint(&ctx.session, t),
            ctx.student.id,
            t,
        )
        .await
        .unwrap();

        SessionService::end(&db, ctx.session.id, t).await.unwrap();

        let overridden = CheckInService::override_status(
            &db,
            rec.id,
            AttendanceStatus::Present,
            ctx.teacher.id,
            Some("verified in person"),
            t + Duration::seconds(60),
        )
        .await
        .unwrap();
        assert_eq!(overridden.status, AttendanceStatus::Present);
    }
}
