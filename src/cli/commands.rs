// Subcommand handling

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::output::{changes_to_json, format_changes};
use super::{Cli, Command, DiffArgs, InputArgs, PromptArgs, RunArgs};
use crate::composer::{has_data_marker, DEFAULT_PROMPT_TEMPLATE};
use crate::config::{load_config, load_config_from, load_prompt_template, resolve_token, Config};
use crate::document::parse_document;
use crate::errors::PipelineError;
use crate::pipeline::{PseudonymizationRequest, Pseudonymizer};
use crate::providers::{with_retry, ChatCompletionClient, Credentials, RetryPolicy};
use crate::reconciler::diff;

pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => {
            let config = load_cli_config(cli.config.as_deref())?;
            run(args, &config).await
        }
        Command::Diff(args) => diff_files(args),
        Command::Prompt(args) => {
            let config = load_cli_config(cli.config.as_deref())?;
            print_prompt(args, &config)
        }
        Command::Template => {
            println!("{}", DEFAULT_PROMPT_TEMPLATE);
            Ok(())
        }
    }
}

fn load_cli_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {} {}", what, path.display()))
}

/// Read and validate the subject document, reference data and template
fn build_request(
    input: &InputArgs,
    config: &Config,
    credentials: Credentials,
) -> Result<PseudonymizationRequest> {
    let document = read_file(&input.input, "input document")?;
    let reference = input
        .reference
        .as_deref()
        .map(|path| read_file(path, "reference data"))
        .transpose()?;
    let template = load_prompt_template(input.prompt.as_deref(), config)?;

    let request =
        PseudonymizationRequest::from_json(&document, template, reference.as_deref(), credentials)?;
    Ok(request)
}

async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let token = resolve_token(args.token.as_deref(), config)?;
    let request = build_request(&args.input, config, Credentials::new(token))?;

    let client = ChatCompletionClient::with_endpoint(
        config.api.endpoint.clone(),
        config.api.model.clone(),
        config.api.timeout_seconds,
    )?;
    let pseudonymizer = Pseudonymizer::new(Arc::new(client));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, abandoning request");
            on_interrupt.cancel();
        }
    });

    eprintln!("Pseudonymizing {} ...", args.input.input.display());

    let pseudonymizer = &pseudonymizer;
    let request = &request;
    let cancel_ref = &cancel;
    let outcome = with_retry(RetryPolicy::new(args.retries), move || {
        pseudonymizer.run_cancellable(request, cancel_ref)
    })
    .await
    .map_err(report_failure)?;

    let output_path = args.output.as_deref().unwrap_or(&config.output_path);
    fs::write(output_path, format!("{}\n", outcome.candidate_pretty()))
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    eprintln!("Wrote pseudonymized document to {}", output_path.display());

    print_changes(&outcome.changes, args.json);
    Ok(())
}

/// Turn a pipeline failure into a user-facing error, keeping diagnostics in the log
fn report_failure(err: PipelineError) -> anyhow::Error {
    tracing::debug!(category = err.category().as_str(), "Pipeline failed: {:?}", err);

    if let Some(raw) = err.raw_response() {
        tracing::warn!("Raw model response:\n{}", raw);
    }

    let hint = match &err {
        PipelineError::Auth { .. } => "Check your API token.",
        PipelineError::Validation { .. } | PipelineError::Parse { .. } => {
            "Adjust the input or prompt template and try again."
        }
        _ if err.is_retryable() => "This may be temporary; try again or pass --retries.",
        _ => "",
    };

    let message = format!("Pseudonymization failed: {}", err);
    if hint.is_empty() {
        anyhow::anyhow!(message)
    } else {
        anyhow::anyhow!("{}\n{}", message, hint)
    }
}

fn diff_files(args: DiffArgs) -> Result<()> {
    let original = parse_document(&read_file(&args.original, "original document")?)?;
    let candidate = parse_document(&read_file(&args.candidate, "candidate document")?)?;

    print_changes(&diff(&original, &candidate), args.json);
    Ok(())
}

fn print_prompt(args: PromptArgs, config: &Config) -> Result<()> {
    // No token needed for a dry run
    let request = build_request(&args.input, config, Credentials::new(""))?;

    if !has_data_marker(&request.template) {
        eprintln!("Warning: prompt template has no {{DATA}} marker; the document will not be included.");
    }

    println!("{}", request.prompt());
    Ok(())
}

fn print_changes(changes: &[crate::reconciler::ChangeRecord], json: bool) {
    if json {
        println!("{}", changes_to_json(changes));
    } else {
        print!("{}", format_changes(changes, io::stdout().is_terminal()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_build_request_with_reference_and_template() {
        let dir = TempDir::new().unwrap();
        let input = InputArgs {
            input: write(&dir, "data.json", r#"{"name": "Jane"}"#),
            reference: Some(write(&dir, "ref.json", r#"{"names": {"lastNames": ["Moe"]}}"#)),
            prompt: Some(write(&dir, "prompt.txt", "Swap names in {DATA}")),
        };

        let request = build_request(&input, &Config::default(), Credentials::new("t")).unwrap();
        let prompt = request.prompt();
        assert!(prompt.starts_with("Swap names in {\n  \"name\": \"Jane\"\n}"));
        assert!(prompt.contains("\"Moe\""));
    }

    #[test]
    fn test_build_request_rejects_bad_reference() {
        let dir = TempDir::new().unwrap();
        let input = InputArgs {
            input: write(&dir, "data.json", "{}"),
            reference: Some(write(&dir, "ref.json", r#"{"names": {}}"#)),
            prompt: None,
        };

        let err = build_request(&input, &Config::default(), Credentials::new("t")).unwrap_err();
        assert!(err.to_string().contains("Invalid custom data"));
    }

    #[test]
    fn test_build_request_missing_input_file() {
        let input = InputArgs {
            input: PathBuf::from("/nonexistent/data.json"),
            reference: None,
            prompt: None,
        };
        assert!(build_request(&input, &Config::default(), Credentials::new("t")).is_err());
    }

    #[test]
    fn test_report_failure_hints() {
        let err = report_failure(PipelineError::Auth {
            status: 401,
            message: "Bad credentials".to_string(),
        });
        let text = err.to_string();
        assert!(text.starts_with("Pseudonymization failed: Authentication failed"));
        assert!(text.contains("Check your API token."));

        let err = report_failure(PipelineError::Service {
            status: Some(503),
            message: "busy".to_string(),
        });
        assert!(err.to_string().contains("--retries"));
    }
}
