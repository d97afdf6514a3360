use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, TestkitError};

/// Harness configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Install doubles only; skip polling the system under test.
    pub run_dependencies_only: bool,

    // Polling
    pub retry_attempts: u32,
    pub retry_interval: Duration,

    // HTTP mocks
    pub default_status: u16,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            run_dependencies_only: false,
            retry_attempts: 5,
            retry_interval: Duration::from_millis(41),
            default_status: 200,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `ELFIN_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            run_dependencies_only: match lookup("ELFIN_RUN_DEPENDENCIES_ONLY") {
                Some(raw) => parse_flag("ELFIN_RUN_DEPENDENCIES_ONLY", &raw)?,
                None => defaults.run_dependencies_only,
            },
            retry_attempts: parse_var(&lookup, "ELFIN_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.retry_attempts),
            retry_interval: parse_var(&lookup, "ELFIN_RETRY_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_interval),
            default_status: parse_var(&lookup, "ELFIN_DEFAULT_STATUS")?
                .unwrap_or(defaults.default_status),
        })
    }

    pub fn log_summary(&self) {
        info!(
            run_dependencies_only = self.run_dependencies_only,
            retry_attempts = self.retry_attempts,
            retry_interval = ?self.retry_interval,
            default_status = self.default_status,
            "harness config"
        );
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| TestkitError::Config(format!("{key} must be a number, got '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TestkitError::Config(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}
