//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::{OnceLock, RwLock};

/// Policy for external status codes that are not in the mapping table of the
/// source system. There is deliberately no implicit default to Present or
/// Absent; the choice is always an explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatusPolicy {
    /// Fail the request with an `UnknownStatusCode` error.
    Reject,
    /// Record the canonical `Unknown` status instead of failing.
    MapToUnknown,
}

impl UnknownStatusPolicy {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "map_to_unknown" => UnknownStatusPolicy::MapToUnknown,
            _ => UnknownStatusPolicy::Reject,
        }
    }
}

/// Default treatment of scheduled sessions that have no attendance record
/// inside a summary range. Can be overridden per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRecordPolicy {
    /// Exclude sessions without records from the totals.
    NoData,
    /// Count sessions without records as `Absent`.
    ImplicitAbsent,
}

impl MissingRecordPolicy {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "implicit_absent" => MissingRecordPolicy::ImplicitAbsent,
            _ => MissingRecordPolicy::NoData,
        }
    }
}

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    pub scan_grace_minutes: i64,
    pub qr_token_ttl_seconds: i64,
    pub bulk_workers: usize,
    pub unknown_status_policy: UnknownStatusPolicy,
    pub summary_missing_policy: MissingRecordPolicy,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// This method is used internally to populate the singleton. It panics
    /// if required variables are missing or improperly formatted.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "rollcall".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH").expect("DATABASE_PATH is required"),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .expect("PORT must be a valid u16"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET is required"),
            jwt_duration_minutes: env::var("JWT_DURATION_MINUTES")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .expect("JWT_DURATION_MINUTES must be a valid integer"),
            scan_grace_minutes: env::var("SCAN_GRACE_MINUTES")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .expect("SCAN_GRACE_MINUTES must be a valid integer"),
            qr_token_ttl_seconds: env::var("QR_TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| "300".into())
                .parse::<i64>()
                .expect("QR_TOKEN_TTL_SECONDS must be a valid integer")
                .clamp(30, 3600),
            bulk_workers: env::var("BULK_WORKERS")
                .unwrap_or_else(|_| "8".into())
                .parse::<usize>()
                .expect("BULK_WORKERS must be a valid integer")
                .clamp(1, 64),
            unknown_status_policy: UnknownStatusPolicy::parse(
                &env::var("UNKNOWN_STATUS_POLICY").unwrap_or_else(|_| "reject".into()),
            ),
            summary_missing_policy: MissingRecordPolicy::parse(
                &env::var("SUMMARY_MISSING_POLICY").unwrap_or_else(|_| "no_data".into()),
            ),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    ///
    /// Used by public per-field setter methods.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_scan_grace_minutes(value: i64) {
        AppConfig::set_field(|cfg| cfg.scan_grace_minutes = value);
    }

    pub fn set_qr_token_ttl_seconds(value: i64) {
        AppConfig::set_field(|cfg| cfg.qr_token_ttl_seconds = value.clamp(30, 3600));
    }

    pub fn set_bulk_workers(value: usize) {
        AppConfig::set_field(|cfg| cfg.bulk_workers = value.clamp(1, 64));
    }

    pub fn set_unknown_status_policy(value: UnknownStatusPolicy) {
        AppConfig::set_field(|cfg| cfg.unknown_status_policy = value);
    }

    pub fn set_summary_missing_policy(value: MissingRecordPolicy) {
        AppConfig::set_field(|cfg| cfg.summary_missing_policy = value);
    }
}

// --- Free-function accessors (call sites read as `config::host()`) ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn jwt_duration_minutes() -> u64 {
    AppConfig::global().jwt_duration_minutes
}

pub fn scan_grace_minutes() -> i64 {
    AppConfig::global().scan_grace_minutes
}

pub fn qr_token_ttl_seconds() -> i64 {
    AppConfig::global().qr_token_ttl_seconds
}

pub fn bulk_workers() -> usize {
    AppConfig::global().bulk_workers
}

pub fn unknown_status_policy() -> UnknownStatusPolicy {
    AppConfig::global().unknown_status_policy
}

pub fn summary_missing_policy() -> MissingRecordPolicy {
    AppConfig::global().summary_missing_policy
}
