// Configuration structs

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::constants::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_OUTPUT_FILE, DEFAULT_TIMEOUT_SECS};

/// Completion endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer token (falls back to `GITHUB_TOKEN` when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Chat-completion URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    /// Instruction template file; the built-in template is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template_path: Option<PathBuf>,

    /// Where the pseudonymized document is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            prompt_template_path: None,
            output_path: default_output_path(),
        }
    }
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            bail!("api.endpoint must not be empty");
        }
        if !self.api.endpoint.starts_with("http://") && !self.api.endpoint.starts_with("https://") {
            bail!(
                "api.endpoint must be an http(s) URL, got '{}'",
                self.api.endpoint
            );
        }
        if self.api.model.trim().is_empty() {
            bail!("api.model must not be empty");
        }
        if self.api.timeout_seconds == 0 {
            bail!("api.timeout_seconds must be greater than zero");
        }
        Ok(())
    }
}
