use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;

use crate::models::user_class_role::{
    Column as RoleColumn, Entity as RoleEntity, Role,
};

/// Represents a user in the `users` table.
///
/// Authentication and profile data live in the external identity store; this
/// table only carries what the attendance core needs for enrollment, role
/// checks, and absence notices.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique student/staff number.
    pub username: String,
    /// User's unique email address, the absence-notice destination.
    pub email: String,
    /// Whether the user has admin privileges.
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_class_role::Entity")]
    ClassRoles,
}

impl Related<super::user_class_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassRoles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        admin: bool,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let user = ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.to_owned()),
            admin: Set(admin),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        user.insert(db).await
    }

    /// Whether the user holds `role` in the given class.
    pub async fn is_in_role(
        db: &DatabaseConnection,
        user_id: i64,
        class_id: i64,
        role: Role,
    ) -> Result<bool, DbErr> {
        let found = RoleEntity::find()
            .filter(RoleColumn::UserId.eq(user_id))
            .filter(RoleColumn::ClassId.eq(class_id))
            .filter(RoleColumn::Role.eq(role))
            .one(db)
            .await?;
        Ok(found.is_some())
    }
}
