// Completion service abstraction
//
// The pipeline talks to the model through `CompletionClient`, so the HTTP
// implementation can be swapped for any other text-in/text-out backend.

use async_trait::async_trait;
use std::fmt;

use crate::errors::Result;

pub mod openai;
pub mod retry;

pub use openai::ChatCompletionClient;
pub use retry::{with_retry, RetryPolicy};

/// Bearer token for the completion endpoint.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Text-in / text-out completion backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one prompt and return the raw completion text verbatim
    async fn complete(&self, prompt: &str, credentials: &Credentials) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
