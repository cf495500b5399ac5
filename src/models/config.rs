//! Tuning configuration structures.
//!
//! Required deployment settings (registry id, job name, credentials) live in
//! [`crate::config::StartupConfig`]; this file only covers knobs with sane
//! defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root tuning configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Registry HTTP client settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Ingestion job dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Per-run orchestration settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parse_into<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            target: &mut T,
        ) {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse() {
                    Ok(value) => *target = value,
                    Err(_) => log::warn!("Ignoring unparseable {}={:?}", key, raw),
                }
            }
        }

        parse_into(&lookup, "REGISTRY_TIMEOUT_SECS", &mut self.registry.timeout_secs);
        parse_into(&lookup, "REGISTRY_MAX_RETRIES", &mut self.registry.max_retries);
        parse_into(&lookup, "REGISTRY_RETRY_DELAY_MS", &mut self.registry.retry_delay_ms);
        parse_into(&lookup, "DISPATCH_TIMEOUT_SECS", &mut self.dispatch.timeout_secs);
        parse_into(&lookup, "DISPATCH_MAX_ATTEMPTS", &mut self.dispatch.max_attempts);
        parse_into(&lookup, "MAX_CONCURRENT", &mut self.orchestrator.max_concurrent);
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.registry.user_agent.trim().is_empty() {
            return Err(AppError::validation("registry.user_agent is empty"));
        }
        if self.registry.timeout_secs == 0 {
            return Err(AppError::validation("registry.timeout_secs must be > 0"));
        }
        if self.registry.page_size == 0 {
            return Err(AppError::validation("registry.page_size must be > 0"));
        }
        if self.dispatch.timeout_secs == 0 {
            return Err(AppError::validation("dispatch.timeout_secs must be > 0"));
        }
        if self.dispatch.max_attempts == 0 {
            return Err(AppError::validation("dispatch.max_attempts must be > 0"));
        }
        if self.orchestrator.max_concurrent == 0 {
            return Err(AppError::validation(
                "orchestrator.max_concurrent must be > 0",
            ));
        }
        Ok(())
    }
}

/// Registry HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// User-Agent header for registry requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::registry_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a transient failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Rows requested per page when listing feeds
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::registry_timeout(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            page_size: defaults::page_size(),
        }
    }
}

/// Ingestion job dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Operation timeout for one invoke call, in seconds
    #[serde(default = "defaults::dispatch_timeout")]
    pub timeout_secs: u64,

    /// Total attempts including the first one
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::dispatch_timeout(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Feeds processed concurrently (1 means strictly sequential)
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

mod defaults {
    // Registry defaults
    pub fn user_agent() -> String {
        concat!("feed-trigger/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn registry_timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_delay() -> u64 {
        500
    }
    pub fn page_size() -> usize {
        1000
    }

    // Dispatch defaults
    pub fn dispatch_timeout() -> u64 {
        10
    }
    pub fn max_attempts() -> u32 {
        3
    }

    // Orchestrator defaults
    pub fn max_concurrent() -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.registry.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.orchestrator.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry]\ntimeout_secs = 5\n\n[orchestrator]\nmax_concurrent = 4").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.registry.timeout_secs, 5);
        assert_eq!(config.registry.page_size, 1000);
        assert_eq!(config.orchestrator.max_concurrent, 4);
        assert_eq!(config.dispatch.max_attempts, 3);
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("nope.toml"));
        assert_eq!(config.registry.timeout_secs, 30);
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("REGISTRY_TIMEOUT_SECS", "7"),
            ("MAX_CONCURRENT", "lots"),
            ("DISPATCH_MAX_ATTEMPTS", " 5 "),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.registry.timeout_secs, 7);
        assert_eq!(config.orchestrator.max_concurrent, 1);
        assert_eq!(config.dispatch.max_attempts, 5);
    }
}
