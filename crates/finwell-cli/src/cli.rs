//! CLI argument definitions for finwell.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `classify` | Detect the domain and entity of a query |
//! | `score` | Aggregate the sentiment of one or more texts |
//! | `respond` | Answer a query end to end |
//! | `plans` | Suggest insurance plans for a monthly income |
//! | `chat` | Line-oriented chat over stdin |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table, text) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--config` | built-in tables | JSON or YAML pipeline configuration |
//! | `--offline` | `false` | Never send network requests |
//!
//! # Examples
//!
//! ```bash
//! finwell classify "what's the balance of bitcoin"
//! finwell --format text respond "How is AAPL stock doing?"
//! finwell score "btc looks strong" "eth fell sharply" --source forum
//! finwell chat
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Finwell - finance, crypto, health and insurance assistant
#[derive(Debug, Parser)]
#[command(
    name = "finwell",
    author,
    version,
    about = "Finance, crypto, health and insurance query assistant",
    long_about = "Finwell routes a free-text question to the right domain (stocks, crypto, health \
or insurance), gathers market data and sentiment, and answers with a formatted report.\n\
\n\
Provider keys are read from FINWELL_* environment variables. Use --offline to run without \
network access.\n\
\n\
Use 'finwell <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    ///
    /// - json: Single JSON envelope (default)
    /// - table: Metadata header plus indented data
    /// - text: The human-readable answer only
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Pipeline configuration file (.json, .yaml or .yml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not contact any provider; handlers fall back to offline output.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object output.
    Json,
    /// Metadata header plus indented data.
    Table,
    /// Plain text answer.
    Text,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect the domain, entity and matched keywords of a query.
    ///
    /// # Examples
    ///
    ///   finwell classify "what's the balance of bitcoin"
    ///   finwell classify tell me about cigna insurance
    Classify(QueryArgs),

    /// Score texts with the built-in lexicon and aggregate them.
    ///
    /// # Examples
    ///
    ///   finwell score "btc rally looks strong" "fees are a concern"
    Score(ScoreArgs),

    /// Answer a query end to end: classify, fetch data, aggregate and format.
    ///
    /// # Examples
    ///
    ///   finwell respond "How is AAPL stock doing?"
    ///   finwell --offline --format text respond "I have a headache"
    Respond(RespondArgs),

    /// Suggest health insurance plans for a monthly income.
    ///
    /// # Examples
    ///
    ///   finwell plans 45000
    Plans(PlansArgs),

    /// Read queries from stdin, one per line, until `exit` or `quit`.
    ///
    /// A line holding only a number is answered with insurance plans for that monthly income.
    Chat,
}

/// Free-text query, words joined with spaces.
#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

impl QueryArgs {
    pub fn joined(&self) -> String {
        self.text.join(" ")
    }
}

/// Arguments for the `score` command.
#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// One or more texts to score.
    #[arg(required = true, num_args = 1..)]
    pub texts: Vec<String>,

    /// Source label recorded for every text.
    #[arg(long, default_value = "cli")]
    pub source: String,
}

/// Arguments for the `respond` command.
#[derive(Debug, Args)]
pub struct RespondArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Identifier of the sender, recorded in logs.
    #[arg(long)]
    pub sender: Option<String>,
}

/// Arguments for the `plans` command.
#[derive(Debug, Args)]
pub struct PlansArgs {
    /// Monthly income.
    pub income: f64,
}
