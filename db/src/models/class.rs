use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

/// A class (course group) to which students enroll and sessions attach.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique class code, e.g. "CS201".
    pub code: String,
    pub title: String,
    /// Normalized weekly schedule, stored as a JSON array of [`ScheduleSlot`].
    pub schedule: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One weekly meeting slot. The schedule is always this shape — validated at
/// write time, so readers never normalize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Day of week, "monday".."sunday".
    pub day: String,
    /// Start time of the slot, "HH:MM" 24-hour.
    pub time: String,
    pub duration_minutes: u32,
}

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

impl ScheduleSlot {
    /// Validates a slot: known weekday, parseable HH:MM, positive duration.
    pub fn validate(&self) -> Result<(), String> {
        if !WEEKDAYS.contains(&self.day.as_str()) {
            return Err(format!("unknown weekday '{}'", self.day));
        }
        let mut parts = self.time.splitn(2, ':');
        let hh = parts.next().and_then(|p| p.parse::<u32>().ok());
        let mm = parts.next().and_then(|p| p.parse::<u32>().ok());
        match (hh, mm) {
            (Some(h), Some(m)) if h < 24 && m < 60 => {}
            _ => return Err(format!("invalid time '{}'", self.time)),
        }
        if self.duration_minutes == 0 {
            return Err("duration_minutes must be positive".into());
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::class_session::Entity")]
    Sessions,
    #[sea_orm(has_many = "super::user_class_role::Entity")]
    Roles,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::user_class_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Roles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a class with a validated schedule.
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        title: &str,
        schedule: Vec<ScheduleSlot>,
    ) -> Result<Self, DbErr> {
        for slot in &schedule {
            slot.validate()
                .map_err(|e| DbErr::Custom(format!("invalid schedule slot: {e}")))?;
        }
        let schedule_json = serde_json::to_value(&schedule)
            .map_err(|e| DbErr::Custom(format!("failed to serialize schedule: {e}")))?;

        let now = Utc::now();
        let class = ActiveModel {
            code: Set(code.to_owned()),
            title: Set(title.to_owned()),
            schedule: Set(schedule_json),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        class.insert(db).await
    }

    /// Deserializes the stored schedule back into typed slots.
    pub fn schedule_slots(&self) -> Result<Vec<ScheduleSlot>, serde_json::Error> {
        serde_json::from_value(self.schedule.clone())
    }
}
