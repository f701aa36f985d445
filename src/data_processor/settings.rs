//! Process configuration read from environment variables.

use super::domain::DeploymentEnvironment;
use crate::telemetry::{LogFormat, ParseLogFormatError};
use camino::Utf8PathBuf;
use thiserror::Error;

/// `PostgreSQL` connection string.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
/// Current deployment environment name.
pub const ENVIRONMENT_VAR: &str = "GROUNDWORK_ENVIRONMENT";
/// Directory holding SQL fixture scripts.
pub const FIXTURE_ROOT_VAR: &str = "GROUNDWORK_FIXTURE_ROOT";
/// `pretty` or `json`.
pub const LOG_FORMAT_VAR: &str = "GROUNDWORK_LOG_FORMAT";

/// Errors returned while loading settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A required variable is unset.
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    /// A variable is set but blank.
    #[error("environment variable {0} must not be empty")]
    Empty(&'static str),

    /// The log format is not recognised.
    #[error(transparent)]
    LogFormat(#[from] ParseLogFormatError),
}

/// Settings for one data processor process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataProcessorSettings {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Environment fixtures are filtered against. Defaults to `Production`.
    pub environment: DeploymentEnvironment,
    /// Root directory of SQL fixture scripts, if any.
    pub fixture_root: Option<Utf8PathBuf>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl DataProcessorSettings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a required variable is missing or a
    /// value is invalid.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a required variable is missing or a
    /// value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| -> Result<Option<String>, SettingsError> {
            match lookup(name) {
                None => Ok(None),
                Some(value) if value.trim().is_empty() => Err(SettingsError::Empty(name)),
                Some(value) => Ok(Some(value.trim().to_owned())),
            }
        };

        let database_url = read(DATABASE_URL_VAR)?.ok_or(SettingsError::Missing(DATABASE_URL_VAR))?;
        let environment = read(ENVIRONMENT_VAR)?
            .map_or_else(DeploymentEnvironment::production, DeploymentEnvironment::new);
        let fixture_root = read(FIXTURE_ROOT_VAR)?.map(Utf8PathBuf::from);
        let log_format = read(LOG_FORMAT_VAR)?
            .map(|value| value.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            database_url,
            environment,
            fixture_root,
            log_format,
        })
    }
}
