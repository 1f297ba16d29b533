use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608200001_create_users::Migration),
            Box::new(migrations::m202608200002_create_classes::Migration),
            Box::new(migrations::m202608200003_create_user_class_roles::Migration),
            Box::new(migrations::m202608200004_create_class_sessions::Migration),
            Box::new(migrations::m202608200005_create_attendance_records::Migration),
        ]
    }
}
