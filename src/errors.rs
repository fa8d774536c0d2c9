// Pipeline error taxonomy
//
// Every stage of a pseudonymization run fails fast with one of these
// variants. Callers use `category()` / `is_retryable()` to decide whether
// a retry makes sense or the user has to fix their input.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed or insufficient subject document / reference data
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Network-level failure talking to the completion endpoint
    #[error("Could not reach the completion service: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    /// Credentials rejected by the completion endpoint
    #[error("Authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    /// Any other failure reported by the completion endpoint
    #[error("Completion service error: {message}")]
    Service { status: Option<u16>, message: String },

    /// Completion text was not valid JSON after fence stripping
    #[error("Could not interpret the model's response as JSON: {source}")]
    Parse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// A pseudonymization run is already in flight
    #[error("A pseudonymization request is already in progress")]
    Busy,

    /// The in-flight request was abandoned by the caller
    #[error("Pseudonymization was cancelled")]
    Cancelled,
}

/// Coarse grouping used by front ends to pick a recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Transport,
    Auth,
    Service,
    Parse,
    Busy,
    Cancelled,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Service => "service",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Busy => "busy",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Validation { .. } => ErrorCategory::Validation,
            PipelineError::Transport { .. } => ErrorCategory::Transport,
            PipelineError::Auth { .. } => ErrorCategory::Auth,
            PipelineError::Service { .. } => ErrorCategory::Service,
            PipelineError::Parse { .. } => ErrorCategory::Parse,
            PipelineError::Busy => ErrorCategory::Busy,
            PipelineError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Transport and service failures may succeed on a later attempt.
    /// Validation, auth and parse failures need the input changed first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Transport { .. } | PipelineError::Service { .. }
        )
    }

    /// Raw completion text kept for diagnostics on parse failures
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PipelineError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// HTTP status reported by the endpoint, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Auth { status, .. } => Some(*status),
            PipelineError::Service { status, .. } => *status,
            _ => None,
        }
    }
}
