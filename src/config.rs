// src/config.rs

//! Startup configuration.
//!
//! Deployment settings are read once from the environment when the process
//! starts. Any missing or malformed value is fatal: no run is attempted.
//!
//! ## Environment Variables
//!
//! - `DATASET_ID`: registry dataset identifier (e.g. `abcd-1234`)
//! - `LAMBDA_TO_TRIGGER`: name of the ingestion function to invoke
//! - `SOCRATA_PARAMS`: JSON object with `domain`, `username`, `password` and
//!   optionally `app_token`

use std::fmt;

use serde::Deserialize;

use crate::error::{AppError, Result};

pub const DATASET_ID_VAR: &str = "DATASET_ID";
pub const JOB_NAME_VAR: &str = "LAMBDA_TO_TRIGGER";
pub const SOCRATA_PARAMS_VAR: &str = "SOCRATA_PARAMS";

/// Registry connection parameters.
#[derive(Clone, Deserialize)]
pub struct SocrataParams {
    /// Host name of the Socrata site, without scheme
    pub domain: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub app_token: Option<String>,
}

impl SocrataParams {
    fn validate(&self) -> Result<()> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(AppError::config("SOCRATA_PARAMS.domain is empty"));
        }
        if domain.contains("://") || domain.contains('/') {
            return Err(AppError::config(format!(
                "SOCRATA_PARAMS.domain must be a bare host name, got {domain:?}"
            )));
        }
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::config(
                "SOCRATA_PARAMS must include username and password",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SocrataParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocrataParams")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("app_token", &self.app_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validated deployment settings.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Registry dataset identifier
    pub dataset_id: String,
    /// Ingestion job to dispatch
    pub job_name: String,
    /// Registry connection parameters
    pub socrata: SocrataParams,
}

impl StartupConfig {
    /// Read and validate settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read and validate settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = [DATASET_ID_VAR, JOB_NAME_VAR, SOCRATA_PARAMS_VAR]
            .into_iter()
            .filter(|key| read(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::config(format!(
                "Required environment variable(s) not set: {}",
                missing.join(", ")
            )));
        }

        let dataset_id = read(DATASET_ID_VAR).unwrap_or_default().trim().to_string();
        let job_name = read(JOB_NAME_VAR).unwrap_or_default().trim().to_string();
        let raw_params = read(SOCRATA_PARAMS_VAR).unwrap_or_default();

        let mut socrata: SocrataParams = serde_json::from_str(&raw_params).map_err(|e| {
            AppError::config(format!("{SOCRATA_PARAMS_VAR} is not valid JSON params: {e}"))
        })?;
        socrata.domain = socrata.domain.trim().to_string();
        socrata.validate()?;

        Ok(Self {
            dataset_id,
            job_name,
            socrata,
        })
    }

    /// Human-facing location of the registry dataset.
    pub fn registry_location(&self) -> String {
        format!("https://{}/d/{}", self.socrata.domain, self.dataset_id)
    }
}
