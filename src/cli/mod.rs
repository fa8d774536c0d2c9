// CLI module
// Command-line front end for the pseudonymization pipeline

mod commands;
pub mod output;

pub use commands::handle_command;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pseudonymizer")]
#[command(about = "Pseudonymize JSON documents with a chat-completion model and audit the changes", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.pseudonymizer/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a document to the model and write the pseudonymized copy
    Run(RunArgs),

    /// Compare two JSON documents field by field
    Diff(DiffArgs),

    /// Print the prompt that would be sent, without calling the model
    Prompt(PromptArgs),

    /// Print the built-in prompt template
    Template,
}

/// Inputs shared by `run` and `prompt`
#[derive(Args, Debug)]
pub struct InputArgs {
    /// JSON document to pseudonymize
    pub input: PathBuf,

    /// Reference data with names/addresses to draw replacements from
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Prompt template file containing a {DATA} marker
    #[arg(short, long)]
    pub prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Where to write the pseudonymized document
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// API token (overrides config file and GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Retry transport/service failures this many times
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Print the change list as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Original document
    pub original: PathBuf,

    /// Pseudonymized document
    pub candidate: PathBuf,

    /// Print the change list as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PromptArgs {
    #[command(flatten)]
    pub input: InputArgs,
}
