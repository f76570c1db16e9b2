//! Aggregation Engine.
//!
//! On-demand summaries over the attendance record store. Summaries are a
//! derived projection, recomputed on every call, never cached as ground
//! truth; the same store state always yields the same counts. Scheduled
//! sessions without a record are a data condition resolved by the configured
//! [`MissingRecordPolicy`], never an error.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use db::models::{attendance_record, attendee, schedule_session};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use util::config::MissingRecordPolicy;

use crate::error::ServiceError;
use crate::roster::RosterDirectory;

use db::models::attendance_record::CanonicalStatus;

/// What the summary ranges over: one attendee or one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum SummaryScope {
    Attendee(i64),
    Class(i64),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GroupBy {
    Total,
    Date,
    Attendee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ServiceError> {
        if from > to {
            return Err(ServiceError::Validation(format!(
                "date range start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }
}

/// Counts per canonical status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: u64,
    pub late: u64,
    pub excused: u64,
    pub sick: u64,
    pub absent: u64,
    pub early_departure: u64,
    pub dispensation: u64,
    pub unknown: u64,
}

impl StatusCounts {
    pub fn bump(&mut self, status: CanonicalStatus) {
        match status {
            CanonicalStatus::Present => self.present += 1,
            CanonicalStatus::Late => self.late += 1,
            CanonicalStatus::Excused => self.excused += 1,
            CanonicalStatus::Sick => self.sick += 1,
            CanonicalStatus::Absent => self.absent += 1,
            CanonicalStatus::EarlyDeparture => self.early_departure += 1,
            CanonicalStatus::Dispensation => self.dispensation += 1,
            CanonicalStatus::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.present
            + self.late
            + self.excused
            + self.sick
            + self.absent
            + self.early_departure
            + self.dispensation
            + self.unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryBucket {
    /// Group key: an ISO date for `GroupBy::Date`, an attendee id for
    /// `GroupBy::Attendee`.
    pub key: String,
    pub counts: StatusCounts,
}

/// A derived, non-persisted projection over the current record set.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub scope: SummaryScope,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub group_by: GroupBy,
    pub missing_policy: MissingRecordPolicy,
    pub totals: StatusCounts,
    /// Present for `date`/`attendee` grouping, sorted by key.
    pub buckets: Vec<SummaryBucket>,
}

pub struct Aggregation;

impl Aggregation {
    /// Computes a summary for the scope over the date range. Pure read: no
    /// side effects, deterministic for an unchanged record set.
    pub async fn summarize(
        db: &DatabaseConnection,
        roster: &dyn RosterDirectory,
        scope: SummaryScope,
        range: DateRange,
        group_by: GroupBy,
        policy: MissingRecordPolicy,
    ) -> Result<AttendanceSummary, ServiceError> {
        let sessions = Self::sessions_in_scope(db, roster, scope, range).await?;
        let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();

        let records = if session_ids.is_empty() {
            Vec::new()
        } else {
            let mut query = attendance_record::Entity::find()
                .filter(attendance_record::Column::SessionId.is_in(session_ids))
                .filter(attendance_record::Column::RecordDate.between(range.from, range.to));
            if let SummaryScope::Attendee(id) = scope {
                query = query.filter(attendance_record::Column::AttendeeId.eq(id));
            }
            query.all(db).await?
        };

        let mut totals = StatusCounts::default();
        let mut buckets: BTreeMap<String, StatusCounts> = BTreeMap::new();
        let mut seen: HashSet<(i64, i64)> = HashSet::new();

        for record in &records {
            totals.bump(record.status);
            seen.insert((record.attendee_id, record.session_id));
            if let Some(key) = Self::bucket_key(group_by, record.attendee_id, record.record_date) {
                buckets.entry(key).or_default().bump(record.status);
            }
        }

        if policy == MissingRecordPolicy::ImplicitAbsent {
            let expected = Self::expected_attendees(roster, scope).await?;
            for session in &sessions {
                for attendee_id in &expected {
                    if seen.contains(&(*attendee_id, session.id)) {
                        continue;
                    }
                    totals.bump(CanonicalStatus::Absent);
                    if let Some(key) =
                        Self::bucket_key(group_by, *attendee_id, session.session_date)
                    {
                        buckets
                            .entry(key)
                            .or_default()
                            .bump(CanonicalStatus::Absent);
                    }
                }
            }
        }

        Ok(AttendanceSummary {
            scope,
            from: range.from,
            to: range.to,
            group_by,
            missing_policy: policy,
            totals,
            buckets: buckets
                .into_iter()
                .map(|(key, counts)| SummaryBucket { key, counts })
                .collect(),
        })
    }

    fn bucket_key(group_by: GroupBy, attendee_id: i64, date: NaiveDate) -> Option<String> {
        match group_by {
            GroupBy::Total => None,
            GroupBy::Date => Some(date.to_string()),
            GroupBy::Attendee => Some(attendee_id.to_string()),
        }
    }

    /// The scheduled sessions the summary ranges over.
    async fn sessions_in_scope(
        db: &DatabaseConnection,
        roster: &dyn RosterDirectory,
        scope: SummaryScope,
        range: DateRange,
    ) -> Result<Vec<schedule_session::Model>, ServiceError> {
        let base = schedule_session::Entity::find()
            .filter(schedule_session::Column::SessionDate.between(range.from, range.to));

        match scope {
            SummaryScope::Class(class_id) => Ok(base
                .filter(schedule_session::Column::ClassId.eq(class_id))
                .all(db)
                .await?),
            SummaryScope::Attendee(attendee_id) => {
                let person = roster.get_attendee(attendee_id).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("attendee {attendee_id} not found"))
                })?;
                match person.kind {
                    attendee::AttendeeKind::Teacher => Ok(base
                        .filter(schedule_session::Column::TeacherId.eq(attendee_id))
                        .all(db)
                        .await?),
                    attendee::AttendeeKind::Student => match person.class_id {
                        Some(class_id) => Ok(base
                            .filter(schedule_session::Column::ClassId.eq(class_id))
                            .all(db)
                            .await?),
                        None => Ok(Vec::new()),
                    },
                }
            }
        }
    }

    /// Who is expected at the scoped sessions, for the implicit-absent policy.
    async fn expected_attendees(
        roster: &dyn RosterDirectory,
        scope: SummaryScope,
    ) -> Result<Vec<i64>, ServiceError> {
        match scope {
            SummaryScope::Attendee(id) => Ok(vec![id]),
            SummaryScope::Class(class_id) => {
                Ok(roster
                    .list_class_attendees(class_id)
                    .await?
                    .into_iter()
                    .map(|a| a.id)
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::{ManualEntry, ManualRecorder};
    use crate::roster::DbRoster;
    use crate::status::SourceSystem;
    use chrono::{Duration, Utc};
    use db::test_utils::setup_test_db;
    use sea_orm::{ActiveModelTrait, Set};

    struct Ctx {
        db: DatabaseConnection,
        roster: DbRoster,
        sessions: Vec<schedule_session::Model>,
        students: Vec<attendee::Model>,
        range: DateRange,
    }

    /// Two students in class 5 with one session per day across two days.
    async fn setup() -> Ctx {
        let db = setup_test_db().await;
        let now = Utc::now();

        let teacher = attendee::ActiveModel {
            display_name: Set("Pak Guru".into()),
            kind: Set(attendee::AttendeeKind::Teacher),
            class_id: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let mut students = Vec::new();
        for name in ["Ana", "Budi"] {
            students.push(
                attendee::ActiveModel {
                    display_name: Set(name.into()),
                    kind: Set(attendee::AttendeeKind::Student),
                    class_id: Set(Some(5)),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(&db)
                .await
                .unwrap(),
            );
        }

        let mut sessions = Vec::new();
        for day in 0..2i64 {
            let starts = now - Duration::days(1) + Duration::days(day);
            sessions.push(
                schedule_session::ActiveModel {
                    class_id: Set(5),
                    teacher_id: Set(teacher.id),
                    subject: Set("History".into()),
                    session_date: Set(starts.date_naive()),
                    starts_at: Set(starts),
                    ends_at: Set(starts + Duration::minutes(45)),
                    ..Default::default()
                }
                .insert(&db)
                .await
                .unwrap(),
            );
        }

        let range = DateRange::new(
            sessions[0].session_date,
            sessions[1].session_date,
        )
        .unwrap();

        Ctx {
            roster: DbRoster::new(db.clone()),
            db,
            sessions,
            students,
            range,
        }
    }

    async fn record(ctx: &Ctx, student: usize, session: usize, code: &str) {
        ManualRecorder::record_one(
            &ctx.db,
            &ctx.roster,
            ManualEntry {
                attendee_id: ctx.students[student].id,
                session_id: ctx.sessions[session].id,
                date: None,
                status_code: code.into(),
                system: SourceSystem::Mobile,
                reason: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn empty_range_is_all_zero_under_no_data() {
        let ctx = setup().await;
        let summary = Aggregation::summarize(
            &ctx.db,
            &ctx.roster,
            SummaryScope::Class(5),
            ctx.range,
            GroupBy::Total,
            MissingRecordPolicy::NoData,
        )
        .await
        .unwrap();

        assert_eq!(summary.totals, StatusCounts::default());
        assert!(summary.buckets.is_empty());
    }

    #[tokio::test]
    async fn empty_range_counts_implicit_absences() {
        let ctx = setup().await;
        let summary = Aggregation::summarize(
            &ctx.db,
            &ctx.roster,
            SummaryScope::Class(5),
            ctx.range,
            GroupBy::Total,
            MissingRecordPolicy::ImplicitAbsent,
        )
        .await
        .unwrap();

        // 2 students x 2 sessions, no records at all
        assert_eq!(summary.totals.absent, 4);
        assert_eq!(summary.totals.total(), 4);
    }

    #[tokio::test]
    async fn summarize_is_deterministic() {
        let ctx = setup().await;
        record(&ctx, 0, 0, "hadir").await;
        record(&ctx, 1, 0, "sakit").await;

        let run = || async {
            Aggregation::summarize(
                &ctx.db,
                &ctx.roster,
                SummaryScope::Class(5),
                ctx.range,
                GroupBy::Attendee,
                MissingRecordPolicy::NoData,
            )
            .await
            .unwrap()
        };
        let first = run().await;
        let second = run().await;

        assert_eq!(first.totals, second.totals);
        assert_eq!(first.buckets, second.buckets);
        assert_eq!(first.totals.present, 1);
        assert_eq!(first.totals.sick, 1);
    }

    #[tokio::test]
    async fn bucket_counts_sum_to_totals() {
        let ctx = setup().await;
        record(&ctx, 0, 0, "hadir").await;
        record(&ctx, 0, 1, "telat").await;
        record(&ctx, 1, 0, "izin").await;

        for group_by in [GroupBy::Date, GroupBy::Attendee] {
            let summary = Aggregation::summarize(
                &ctx.db,
                &ctx.roster,
                SummaryScope::Class(5),
                ctx.range,
                group_by,
                MissingRecordPolicy::ImplicitAbsent,
            )
            .await
            .unwrap();

            let bucket_sum: u64 = summary.buckets.iter().map(|b| b.counts.total()).sum();
            assert_eq!(bucket_sum, summary.totals.total());
        }
    }

    #[tokio::test]
    async fn attendee_scope_only_counts_that_attendee() {
        let ctx = setup().await;
        record(&ctx, 0, 0, "hadir").await;
        record(&ctx, 1, 0, "alpa").await;

        let summary = Aggregation::summarize(
            &ctx.db,
            &ctx.roster,
            SummaryScope::Attendee(ctx.students[0].id),
            ctx.range,
            GroupBy::Total,
            MissingRecordPolicy::ImplicitAbsent,
        )
        .await
        .unwrap();

        // present in session 0, implicitly absent in session 1
        assert_eq!(summary.totals.present, 1);
        assert_eq!(summary.totals.absent, 1);
        assert_eq!(summary.totals.total(), 2);
    }

    #[tokio::test]
    async fn invalid_range_is_rejected() {
        let from = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert!(DateRange::new(from, to).is_err());
    }
}
