//! Port to the external roster/schedule directory.
//!
//! The roster owns attendee identity, class membership and its own uniqueness
//! rules (one homeroom teacher per class, and so on). This core only queries
//! it; [`DbRoster`] reads the mirror tables the collaborator keeps in sync.

use async_trait::async_trait;
use db::models::{attendee, schedule_session};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::error::ServiceError;

#[async_trait]
pub trait RosterDirectory: Send + Sync {
    async fn get_session(&self, id: i64) -> Result<Option<schedule_session::Model>, ServiceError>;

    async fn get_attendee(&self, id: i64) -> Result<Option<attendee::Model>, ServiceError>;

    async fn is_enrolled(&self, attendee_id: i64, class_id: i64) -> Result<bool, ServiceError>;

    /// All attendees currently on a class roster. Used by the aggregation
    /// engine to materialise implicit absences.
    async fn list_class_attendees(
        &self,
        class_id: i64,
    ) -> Result<Vec<attendee::Model>, ServiceError>;
}

/// Roster directory backed by the collaborator's mirror tables.
pub struct DbRoster {
    db: DatabaseConnection,
}

impl DbRoster {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RosterDirectory for DbRoster {
    async fn get_session(&self, id: i64) -> Result<Option<schedule_session::Model>, ServiceError> {
        Ok(schedule_session::Entity::find_by_id(id)
            .one(&self.db)
            .await?)
    }

    async fn get_attendee(&self, id: i64) -> Result<Option<attendee::Model>, ServiceError> {
        Ok(attendee::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn is_enrolled(&self, attendee_id: i64, class_id: i64) -> Result<bool, ServiceError> {
        let Some(person) = self.get_attendee(attendee_id).await? else {
            return Ok(false);
        };

        match person.kind {
            attendee::AttendeeKind::Student => Ok(person.class_id == Some(class_id)),
            // A teacher counts as enrolled in every class they teach.
            attendee::AttendeeKind::Teacher => {
                let teaches = schedule_session::Entity::find()
                    .filter(schedule_session::Column::ClassId.eq(class_id))
                    .filter(schedule_session::Column::TeacherId.eq(attendee_id))
                    .count(&self.db)
                    .await?;
                Ok(teaches > 0)
            }
        }
    }

    async fn list_class_attendees(
        &self,
        class_id: i64,
    ) -> Result<Vec<attendee::Model>, ServiceError> {
        Ok(attendee::Entity::find()
            .filter(attendee::Column::ClassId.eq(class_id))
            .all(&self.db)
            .await?)
    }
}
