//! Status Taxonomy Mapper.
//!
//! One place translates between the canonical status set and every external
//! string vocabulary. The tables are total per source system: every code a
//! system can emit maps to exactly one [`CanonicalStatus`], and the same input
//! always yields the same output. Codes outside a system's table are governed
//! by the configured [`UnknownStatusPolicy`]; there is no silent fallback.

use db::models::attendance_record::CanonicalStatus;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use util::config::UnknownStatusPolicy;

use crate::error::ServiceError;

/// The registered external status vocabularies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SourceSystem {
    /// The mobile scanner client; Indonesian status words.
    Mobile,
    /// The legacy admin web screens; single-letter register codes.
    LegacyWeb,
    /// The API gateway; canonical snake_case codes.
    Gateway,
}

/// Translates an external status code into the canonical set.
///
/// Matching is case-insensitive and whitespace-tolerant. A code that the
/// system's table does not contain fails with `UnknownStatusCode` under
/// [`UnknownStatusPolicy::Reject`], or becomes [`CanonicalStatus::Unknown`]
/// under [`UnknownStatusPolicy::MapToUnknown`].
pub fn to_canonical(
    code: &str,
    system: SourceSystem,
    policy: UnknownStatusPolicy,
) -> Result<CanonicalStatus, ServiceError> {
    let normalized = code.trim().to_lowercase();
    let mapped = match system {
        SourceSystem::Mobile => match normalized.as_str() {
            "hadir" => Some(CanonicalStatus::Present),
            "telat" | "terlambat" => Some(CanonicalStatus::Late),
            "izin" => Some(CanonicalStatus::Excused),
            "sakit" => Some(CanonicalStatus::Sick),
            "alpa" | "alpha" => Some(CanonicalStatus::Absent),
            "pulang_awal" => Some(CanonicalStatus::EarlyDeparture),
            "dispensasi" => Some(CanonicalStatus::Dispensation),
            _ => None,
        },
        SourceSystem::LegacyWeb => match normalized.as_str() {
            "h" => Some(CanonicalStatus::Present),
            "t" => Some(CanonicalStatus::Late),
            "i" => Some(CanonicalStatus::Excused),
            "s" => Some(CanonicalStatus::Sick),
            "a" => Some(CanonicalStatus::Absent),
            _ => None,
        },
        SourceSystem::Gateway => match normalized.as_str() {
            "present" => Some(CanonicalStatus::Present),
            "late" => Some(CanonicalStatus::Late),
            "excused" => Some(CanonicalStatus::Excused),
            "sick" => Some(CanonicalStatus::Sick),
            "absent" => Some(CanonicalStatus::Absent),
            "early_departure" => Some(CanonicalStatus::EarlyDeparture),
            "dispensation" => Some(CanonicalStatus::Dispensation),
            "unknown" => Some(CanonicalStatus::Unknown),
            _ => None,
        },
    };

    match mapped {
        Some(status) => Ok(status),
        None => match policy {
            UnknownStatusPolicy::Reject => Err(ServiceError::UnknownStatusCode {
                system,
                code: code.trim().to_string(),
            }),
            UnknownStatusPolicy::MapToUnknown => Ok(CanonicalStatus::Unknown),
        },
    }
}

/// Translates a canonical status into the target system's encoding.
///
/// Fails with `UnsupportedStatus` when the system has no equivalent code;
/// the caller decides how to surface that, never this mapper.
pub fn from_canonical(
    status: CanonicalStatus,
    system: SourceSystem,
) -> Result<&'static str, ServiceError> {
    let code = match system {
        SourceSystem::Mobile => match status {
            CanonicalStatus::Present => Some("hadir"),
            CanonicalStatus::Late => Some("telat"),
            CanonicalStatus::Excused => Some("izin"),
            CanonicalStatus::Sick => Some("sakit"),
            CanonicalStatus::Absent => Some("alpa"),
            CanonicalStatus::EarlyDeparture => Some("pulang_awal"),
            CanonicalStatus::Dispensation => Some("dispensasi"),
            CanonicalStatus::Unknown => None,
        },
        SourceSystem::LegacyWeb => match status {
            CanonicalStatus::Present => Some("h"),
            CanonicalStatus::Late => Some("t"),
            CanonicalStatus::Excused => Some("i"),
            CanonicalStatus::Sick => Some("s"),
            CanonicalStatus::Absent => Some("a"),
            // The legacy register never grew vocabulary for these.
            CanonicalStatus::EarlyDeparture
            | CanonicalStatus::Dispensation
            | CanonicalStatus::Unknown => None,
        },
        SourceSystem::Gateway => match status {
            CanonicalStatus::Present => Some("present"),
            CanonicalStatus::Late => Some("late"),
            CanonicalStatus::Excused => Some("excused"),
            CanonicalStatus::Sick => Some("sick"),
            CanonicalStatus::Absent => Some("absent"),
            CanonicalStatus::EarlyDeparture => Some("early_departure"),
            CanonicalStatus::Dispensation => Some("dispensation"),
            CanonicalStatus::Unknown => Some("unknown"),
        },
    };

    code.ok_or(ServiceError::UnsupportedStatus { system, status })
}
