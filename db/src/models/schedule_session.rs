use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// A scheduled class period binding a teacher, class, subject and time window.
/// Owned by the external schedule collaborator; immutable once it has occurred.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "schedule_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
    pub subject: String,
    pub session_date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendee::Entity",
        from = "Column::TeacherId",
        to = "super::attendee::Column::Id"
    )]
    Teacher,
    #[sea_orm(has_many = "super::qr_token::Entity")]
    Tokens,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::qr_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A session has concluded once its end time is in the past.
    pub fn has_concluded(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }
}
