use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The current attendance outcome for one (attendee, session, date) key.
///
/// Records are never hard-deleted: a new write for an existing key supersedes
/// the current status and appends the prior value to `edit_history`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attendee_id: i64,
    pub session_id: i64,
    pub record_date: NaiveDate,
    pub status: CanonicalStatus,
    pub reason: Option<String>,
    pub source: RecordSource,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    /// Append-only JSON array of superseded `{status, source, edited_at}`.
    pub edit_history: Json,
}

/// The closed set of attendance outcomes the core understands internally,
/// independent of any caller's string encoding.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CanonicalStatus {
    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "late")]
    Late,

    #[sea_orm(string_value = "excused")]
    Excused,

    #[sea_orm(string_value = "sick")]
    Sick,

    #[sea_orm(string_value = "absent")]
    Absent,

    #[sea_orm(string_value = "early_departure")]
    EarlyDeparture,

    #[sea_orm(string_value = "dispensation")]
    Dispensation,

    #[sea_orm(string_value = "unknown")]
    Unknown,
}

/// How a record entered the system. Manual writes take precedence over scans.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecordSource {
    #[sea_orm(string_value = "scan")]
    Scan,

    #[sea_orm(string_value = "manual")]
    Manual,
}

/// One superseded value in a record's edit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditEntry {
    pub status: CanonicalStatus,
    pub source: RecordSource,
    pub edited_at: DateTime<Utc>,
}

impl Model {
    /// Parses the edit history column. Entries the core did not write are
    /// skipped rather than failing the whole read.
    pub fn history(&self) -> Vec<EditEntry> {
        match &self.edit_history {
            Json::Array(items) => items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::schedule_session::Entity",
        from = "Column::SessionId",
        to = "super::schedule_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::attendee::Entity",
        from = "Column::AttendeeId",
        to = "super::attendee::Column::Id"
    )]
    Attendee,
}

impl Related<super::schedule_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::attendee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendee.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(history: Json) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            attendee_id: 1,
            session_id: 1,
            record_date: now.date_naive(),
            status: CanonicalStatus::Present,
            reason: None,
            source: RecordSource::Scan,
            created_at: now,
            last_edited_at: now,
            edit_history: history,
        }
    }

    #[test]
    fn history_parses_written_entries() {
        let entry = EditEntry {
            status: CanonicalStatus::Sick,
            source: RecordSource::Manual,
            edited_at: Utc::now(),
        };
        let json = Json::Array(vec![serde_json::to_value(&entry).unwrap()]);

        let parsed = record(json).history();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].status, CanonicalStatus::Sick);
        assert_eq!(parsed[0].source, RecordSource::Manual);
    }

    #[test]
    fn history_skips_entries_it_cannot_parse() {
        let entry = EditEntry {
            status: CanonicalStatus::Late,
            source: RecordSource::Scan,
            edited_at: Utc::now(),
        };
        let json = Json::Array(vec![
            serde_json::json!({ "something": "else" }),
            serde_json::to_value(&entry).unwrap(),
        ]);

        let parsed = record(json).history();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].status, CanonicalStatus::Late);
    }

    #[test]
    fn history_of_non_array_column_is_empty() {
        assert!(record(Json::Null).history().is_empty());
    }
}
