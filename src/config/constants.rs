// Project-wide constants
//
// Centralised here so the endpoint, model and generation parameters have
// one source of truth. Import via `use crate::config::constants::*;`.

/// Default chat-completion endpoint (GitHub Models inference)
pub const DEFAULT_ENDPOINT: &str = "https://models.inference.ai.azure.com/chat/completions";

/// Model requested from the endpoint
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature. Moderate so replacements vary between runs.
pub const TEMPERATURE: f32 = 0.7;

/// Output token ceiling for one completion
pub const MAX_TOKENS: u32 = 4000;

/// HTTP timeout for one completion request, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// System turn sent ahead of every prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that pseudonymizes personal data. \
Always return valid JSON without markdown formatting.";

/// Marker in the prompt template replaced by the subject document
pub const DATA_MARKER: &str = "{DATA}";

/// File name used when no output path is given
pub const DEFAULT_OUTPUT_FILE: &str = "pseudonymized-data.json";

/// Environment variable holding the API token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV_VAR: &str = "PSEUDONYMIZER_CONFIG";
