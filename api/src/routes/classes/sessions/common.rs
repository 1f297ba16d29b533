use chrono::{DateTime, NaiveDate, Utc};
use db::models::class_session::{self, SessionStatus};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;

use crate::auth::claims::Claims;
use crate::auth::guards::can_manage_class;

/// Session view returned to teacher clients. The rotating secret never
/// leaves the server; tokens are fetched from the token endpoint instead.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
    pub session_day: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub extended: bool,
    pub status: SessionStatus,
}

impl From<class_session::Model> for SessionResponse {
    fn from(m: class_session::Model) -> Self {
        Self {
            id: m.id,
            class_id: m.class_id,
            teacher_id: m.teacher_id,
            session_day: m.session_day,
            start_time: m.start_time,
            end_time: m.end_time,
            extended: m.extended,
            status: m.status,
        }
    }
}

pub enum SessionAccess {
    Ok(class_session::Model),
    NotFound,
    Forbidden,
}

/// Loads a session, checks it belongs to the class in the path and that the
/// caller may manage that class.
pub async fn load_managed_session(
    db: &DatabaseConnection,
    claims: &Claims,
    class_id: i64,
    session_id: i64,
) -> Result<SessionAccess, sea_orm::DbErr> {
    let session = match class_session::Entity::find_by_id(session_id).one(db).await? {
        Some(s) if s.class_id == class_id => s,
        _ => return Ok(SessionAccess::NotFound),
    };

    if !can_manage_class(db, claims, class_id).await {
        return Ok(SessionAccess::Forbidden);
    }
    Ok(SessionAccess::Ok(session))
}
