// Pseudonymizer - JSON pseudonymization through a chat-completion model
// Library exports

pub mod cli;
pub mod composer;
pub mod config;
pub mod document;
pub mod errors;
pub mod pipeline;
pub mod providers;
pub mod reconciler;

pub use composer::{compose, DEFAULT_PROMPT_TEMPLATE};
pub use document::ReferenceData;
pub use errors::{ErrorCategory, PipelineError};
pub use pipeline::{pseudonymize, PseudonymizationOutcome, PseudonymizationRequest, Pseudonymizer};
pub use providers::{ChatCompletionClient, CompletionClient, Credentials};
pub use reconciler::{diff, extract_json, ChangeRecord};
