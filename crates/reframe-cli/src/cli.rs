//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reframe CLI - Adapt scenario documents to a new scenario.
#[derive(Debug, Parser)]
#[command(name = "reframe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (status only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Adapt a document to a new scenario
    Run(RunArgs),

    /// Print the schema inferred from a document
    Schema(SchemaArgs),

    /// Check a candidate document against an example's schema
    Validate(ValidateArgs),

    /// Manage generator profiles
    Profile(ProfileArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Scenario document (JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Scenario the document currently describes
    #[arg(long, required_unless_present = "current_scenario_file")]
    pub current_scenario: Option<String>,

    /// Read the current scenario from a file
    #[arg(long, conflicts_with = "current_scenario")]
    pub current_scenario_file: Option<PathBuf>,

    /// Scenario to adapt the document to
    #[arg(long, required_unless_present = "new_scenario_file")]
    pub new_scenario: Option<String>,

    /// Read the new scenario from a file
    #[arg(long, conflicts_with = "new_scenario")]
    pub new_scenario_file: Option<PathBuf>,

    /// Directory for output.json, changed_fields.json or state.json
    #[arg(short, long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Override the number of correction rounds
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Workflow options (TOML)
    #[arg(short, long)]
    pub workflow_config: Option<PathBuf>,
}

/// Arguments for the schema command.
#[derive(Debug, Parser)]
pub struct SchemaArgs {
    /// Example document (JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Infer from the scenario-dependent subset only
    #[arg(long)]
    pub subset: bool,

    /// Workflow options (TOML)
    #[arg(short, long)]
    pub workflow_config: Option<PathBuf>,
}

/// Arguments for the validate command.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Candidate text, e.g. a saved generator reply
    #[arg(short, long)]
    pub input: PathBuf,

    /// Example document the schema is inferred from
    #[arg(short, long)]
    pub against: PathBuf,

    /// Infer from the example's scenario-dependent subset
    #[arg(long)]
    pub subset: bool,

    /// Workflow options (TOML)
    #[arg(short, long)]
    pub workflow_config: Option<PathBuf>,
}

/// Arguments for profile management.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Create or update a profile
    Add {
        /// Profile name
        name: String,
        /// Generator endpoint
        #[arg(short, long, default_value = reframe_llm::DEFAULT_ENDPOINT)]
        endpoint: String,
        /// Model name
        #[arg(short, long)]
        model: String,
        /// Request timeout in seconds
        #[arg(short, long, default_value_t = reframe_llm::DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },

    /// Switch to a different profile
    Use {
        /// Profile name
        name: String,
    },

    /// Delete a profile
    Remove {
        /// Profile name
        name: String,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
