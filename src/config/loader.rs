// Configuration loader
// Loads settings from ~/.pseudonymizer/config.toml and the API token from
// the command line, config file or environment variable

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_ENV_VAR, TOKEN_ENV_VAR};
use super::settings::Config;
use crate::composer::DEFAULT_PROMPT_TEMPLATE;

/// Default config location, or the file named by `PSEUDONYMIZER_CONFIG`
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".pseudonymizer").join("config.toml"))
}

/// Load configuration; a missing file means defaults
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config_from(&path)
}

/// Load and validate configuration from an explicit file
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Pick the API token: command line, then config file, then environment
pub fn resolve_token(cli_token: Option<&str>, config: &Config) -> Result<String> {
    let env_token = std::env::var(TOKEN_ENV_VAR).ok();
    match pick_token(cli_token, config.api.token.as_deref(), env_token.as_deref()) {
        Some(token) => Ok(token),
        None => bail!(
            "No API token configured.\n\n\
             Pass --token, set api.token in {}, or export {}=\"...\"",
            config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string()),
            TOKEN_ENV_VAR
        ),
    }
}

fn pick_token(cli: Option<&str>, file: Option<&str>, env: Option<&str>) -> Option<String> {
    [cli, file, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Read the instruction template: explicit file, configured file, or built-in
pub fn load_prompt_template(explicit: Option<&Path>, config: &Config) -> Result<String> {
    match explicit.or(config.prompt_template_path.as_deref()) {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display())),
        None => Ok(DEFAULT_PROMPT_TEMPLATE.to_string()),
    }
}
