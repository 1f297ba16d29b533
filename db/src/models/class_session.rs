use chrono::{DateTime, Utc};
use rand::RngCore;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A time-boxed attendance window for one class on one day.
///
/// The `(class_id, teacher_id, session_day)` unique index makes the same-day
/// session a storage-enforced singleton; starting attendance twice in a day
/// reactivates the existing row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "class_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
    pub session_day: Date,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// One-shot: a session may be extended at most once.
    pub extended: bool,
    /// Rotating-token secret; rotated on every reactivation.
    pub secret: String,
    pub status: SessionStatus,
    pub notifications_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SessionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "ended")]
    Ended,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True iff the session is still accepting check-ins.
    ///
    /// The passage of time ends a session logically before any explicit end
    /// call updates storage, so every authorization check goes through this
    /// predicate rather than reading `status` alone.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && now <= self.end_time
    }

    /// Fresh 32-byte hex secret for token minting.
    pub fn generate_secret() -> String {
        let mut buf = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut buf);
        hex::encode(buf)
    }
}
