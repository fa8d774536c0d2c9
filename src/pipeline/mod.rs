// Pseudonymization pipeline
//
// Composer -> completion client -> reconciler, driven by an explicit
// request object. Every run owns fresh copies of its inputs, so abandoning
// one run never leaks state into the next.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::composer::{compose, has_data_marker};
use crate::document::{parse_document, to_pretty_json, ReferenceData};
use crate::errors::{PipelineError, Result};
use crate::providers::{CompletionClient, Credentials};
use crate::reconciler::{reconcile, ChangeRecord};

/// Immutable inputs for one pseudonymization run
#[derive(Debug, Clone)]
pub struct PseudonymizationRequest {
    pub document: Value,
    pub template: String,
    pub reference: Option<ReferenceData>,
    pub credentials: Credentials,
}

impl PseudonymizationRequest {
    pub fn new(document: Value, template: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            document,
            template: template.into(),
            reference: None,
            credentials,
        }
    }

    pub fn with_reference(mut self, reference: ReferenceData) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Build a request from raw JSON texts, validating both documents
    pub fn from_json(
        document: &str,
        template: impl Into<String>,
        reference: Option<&str>,
        credentials: Credentials,
    ) -> Result<Self> {
        let document = parse_document(document)?;
        let reference = reference.map(ReferenceData::from_json).transpose()?;
        Ok(Self {
            document,
            template: template.into(),
            reference,
            credentials,
        })
    }

    /// Prompt this request sends to the model
    pub fn prompt(&self) -> String {
        compose(&self.document, &self.template, self.reference.as_ref())
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PseudonymizationOutcome {
    pub run_id: Uuid,
    pub original: Value,
    pub candidate: Value,
    pub changes: Vec<ChangeRecord>,
}

impl PseudonymizationOutcome {
    /// Candidate document as written to the output file
    pub fn candidate_pretty(&self) -> String {
        to_pretty_json(&self.candidate)
    }
}

/// Run the whole pipeline once. Fails fast; never returns a partial result.
pub async fn pseudonymize(
    client: &dyn CompletionClient,
    request: &PseudonymizationRequest,
) -> Result<PseudonymizationOutcome> {
    pseudonymize_cancellable(client, request, &CancellationToken::new()).await
}

/// Same as `pseudonymize`, abandoning the network call when `cancel` fires
pub async fn pseudonymize_cancellable(
    client: &dyn CompletionClient,
    request: &PseudonymizationRequest,
    cancel: &CancellationToken,
) -> Result<PseudonymizationOutcome> {
    let run_id = Uuid::new_v4();

    if request.credentials.is_empty() {
        return Err(PipelineError::validation("An API token is required"));
    }

    if !has_data_marker(&request.template) {
        tracing::warn!(
            %run_id,
            "Prompt template has no {{DATA}} marker; the document will not be sent to the model"
        );
    }

    let prompt = request.prompt();
    tracing::info!(%run_id, client = client.name(), "Requesting pseudonymization");

    let raw = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!(%run_id, "Pseudonymization cancelled");
            return Err(PipelineError::Cancelled);
        }
        result = client.complete(&prompt, &request.credentials) => result?,
    };

    let (candidate, changes) = reconcile(&request.document, &raw)?;
    tracing::info!(%run_id, changes = changes.len(), "Pseudonymization complete");

    Ok(PseudonymizationOutcome {
        run_id,
        original: request.document.clone(),
        candidate,
        changes,
    })
}

/// Orchestrator that allows at most one run in flight
pub struct Pseudonymizer {
    client: Arc<dyn CompletionClient>,
    in_flight: AtomicBool,
}

/// Holds the in-flight slot; released on drop, including when a run is abandoned
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Pseudonymizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            in_flight: AtomicBool::new(false),
        }
    }

    fn claim(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    pub async fn run(&self, request: &PseudonymizationRequest) -> Result<PseudonymizationOutcome> {
        self.run_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Rejects with `Busy` while another run holds the slot
    pub async fn run_cancellable(
        &self,
        request: &PseudonymizationRequest,
        cancel: &CancellationToken,
    ) -> Result<PseudonymizationOutcome> {
        let _slot = self.claim()?;
        pseudonymize_cancellable(self.client.as_ref(), request, cancel).await
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Returns a canned completion and records the prompts it saw
    struct ScriptedClient {
        response: String,
        delay: Option<Duration>,
        prompts: StdMutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                delay: None,
                prompts: StdMutex::new(Vec::new()),
            }
        }

        fn slow(response: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(response)
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str, _credentials: &Credentials) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.response.clone())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _prompt: &str, _credentials: &Credentials) -> Result<String> {
            Err(PipelineError::Service {
                status: Some(500),
                message: "upstream exploded".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn jane_request() -> PseudonymizationRequest {
        PseudonymizationRequest::new(
            json!({"user": {"name": "Jane Doe", "city": "Springfield"}}),
            "Pseudonymize: {DATA}",
            Credentials::new("token"),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let client = ScriptedClient::new(
            "```json\n{\"user\":{\"name\":\"J. Smith\",\"city\":\"Springfield\"}}\n```",
        );
        let outcome = pseudonymize(&client, &jane_request()).await.unwrap();

        assert_eq!(
            outcome.changes,
            vec![ChangeRecord {
                path: "user.name".to_string(),
                original: json!("Jane Doe"),
                candidate: json!("J. Smith"),
            }]
        );
        assert_eq!(outcome.original["user"]["name"], "Jane Doe");
        assert!(outcome.candidate_pretty().contains("\"J. Smith\""));

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Pseudonymize: {\n  \"user\""));
    }

    #[tokio::test]
    async fn test_service_error_aborts() {
        let err = pseudonymize(&FailingClient, &jane_request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_unparseable_completion_is_parse_error() {
        let client = ScriptedClient::new("I'm sorry, I can't do that.");
        let err = pseudonymize(&client, &jane_request()).await.unwrap_err();
        assert_eq!(err.raw_response(), Some("I'm sorry, I can't do that."));
    }

    #[tokio::test]
    async fn test_missing_token_rejected_before_request() {
        let client = ScriptedClient::new("{}");
        let mut request = jane_request();
        request.credentials = Credentials::new("");

        let err = pseudonymize(&client, &request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_marker_still_runs() {
        let client = ScriptedClient::new("{\"user\": {}}");
        let mut request = jane_request();
        request.template = "Just make something up".to_string();

        let outcome = pseudonymize(&client, &request).await.unwrap();
        assert!(outcome.changes.is_empty());
        assert_eq!(client.prompts.lock().unwrap()[0], "Just make something up");
    }

    #[tokio::test]
    async fn test_from_json_validates_inputs() {
        let creds = Credentials::new("t");
        assert!(PseudonymizationRequest::from_json("{", "{DATA}", None, creds.clone()).is_err());
        assert!(
            PseudonymizationRequest::from_json("{}", "{DATA}", Some(r#"{"names":{}}"#), creds.clone())
                .is_err()
        );

        let request = PseudonymizationRequest::from_json(
            "{\"a\": 1}",
            "{DATA}",
            Some(r#"{"addresses": {"cities": ["Shelbyville"]}}"#),
            creds,
        )
        .unwrap();
        assert!(request.prompt().contains("Shelbyville"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_rejected_while_busy() {
        let client = Arc::new(ScriptedClient::slow("{}", Duration::from_secs(5)));
        let pseudonymizer = Pseudonymizer::new(client);
        let request = jane_request();

        let (first, second) = tokio::join!(pseudonymizer.run(&request), async {
            tokio::task::yield_now().await;
            pseudonymizer.run(&request).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(PipelineError::Busy)));
        assert!(!pseudonymizer.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_check_does_not_take_the_slot() {
        let client = Arc::new(ScriptedClient::slow("{}", Duration::from_secs(5)));
        let pseudonymizer = Pseudonymizer::new(client);
        let request = jane_request();

        assert!(!pseudonymizer.is_busy());
        let (result, observed) = tokio::join!(
            async {
                // Racing a status check against the start of a run
                assert!(!pseudonymizer.is_busy());
                pseudonymizer.run(&request).await
            },
            async {
                tokio::task::yield_now().await;
                pseudonymizer.is_busy()
            }
        );

        assert!(result.is_ok());
        assert!(observed);
        assert!(!pseudonymizer.is_busy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_status_polling_never_rejects_a_run() {
        let pseudonymizer = Arc::new(Pseudonymizer::new(Arc::new(ScriptedClient::new("{}"))));
        let stop = Arc::new(AtomicBool::new(false));

        let poller = {
            let pseudonymizer = Arc::clone(&pseudonymizer);
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                while !stop.load(Ordering::Relaxed) {
                    let _ = pseudonymizer.is_busy();
                    tokio::task::yield_now().await;
                }
            })
        };

        let request = jane_request();
        for _ in 0..200 {
            assert!(pseudonymizer.run(&request).await.is_ok());
        }

        stop.store(true, Ordering::Relaxed);
        poller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_released_when_run_is_dropped() {
        let client = Arc::new(ScriptedClient::slow("{}", Duration::from_secs(60)));
        let pseudonymizer = Pseudonymizer::new(client);
        let request = jane_request();

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), pseudonymizer.run(&request)).await;
        assert!(timed_out.is_err());
        assert!(!pseudonymizer.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandons_request() {
        let client = Arc::new(ScriptedClient::slow("{}", Duration::from_secs(60)));
        let pseudonymizer = Pseudonymizer::new(client);
        let request = jane_request();
        let cancel = CancellationToken::new();

        let canceller = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        };
        let (result, _) = tokio::join!(pseudonymizer.run_cancellable(&request, &cancel), canceller);
        assert!(matches!(result, Err(PipelineError::Cancelled)));

        // A fresh run afterwards is unaffected
        let outcome = pseudonymizer
            .run_cancellable(&request, &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.changes.is_empty());
    }
}
