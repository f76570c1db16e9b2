use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202601050001_create_attendees::Migration),
            Box::new(migrations::m202601050002_create_schedule_sessions::Migration),
            Box::new(migrations::m202601050003_create_qr_tokens::Migration),
            Box::new(migrations::m202601050004_create_attendance_records::Migration),
        ]
    }
}
