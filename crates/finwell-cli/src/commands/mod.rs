mod chat;
mod classify;
mod plans;
mod respond;
mod score;

use std::process::ExitCode;
use std::sync::Arc;

use finwell_core::{
    Dispatcher, Envelope, EnvelopeError, HttpClient, OfflineHttpClient, PipelineConfig, ProviderId,
    ProviderSettings, ReqwestHttpClient,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Metadata, SCHEMA_VERSION};

pub struct CommandResult {
    pub data: Value,
    pub text: String,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub providers: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, text: impl Into<String>) -> Self {
        Self {
            data,
            text: text.into(),
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            providers: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Failures that degraded the answer without aborting the command.
    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.providers = providers;
        self
    }
}

/// Envelope for machine-readable formats plus the plain answer for `--format text`.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub text: String,
}

/// Shared state built once per invocation from the global flags.
pub struct Context {
    pub config: Arc<PipelineConfig>,
    pub settings: ProviderSettings,
    pub offline: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = match &cli.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        let settings = ProviderSettings::from_env();
        debug!(offline = cli.offline, settings = ?settings, "loaded configuration");

        Ok(Self {
            config: Arc::new(config),
            settings,
            offline: cli.offline,
        })
    }

    pub fn dispatcher(&self) -> Dispatcher {
        let http: Arc<dyn HttpClient> = if self.offline {
            Arc::new(OfflineHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };
        Dispatcher::with_default_handlers(Arc::clone(&self.config), &self.settings, http)
    }
}

pub async fn run(cli: &Cli, context: &Context) -> Result<CommandOutput, CliError> {
    let command_result = match &cli.command {
        Command::Classify(args) => classify::run(args, context)?,
        Command::Score(args) => score::run(args, context)?,
        Command::Respond(args) => respond::run(args, context).await?,
        Command::Plans(args) => plans::run(args, context)?,
        Command::Chat => {
            return Err(CliError::Command(String::from(
                "chat is interactive and does not produce an envelope",
            )))
        }
    };

    let CommandResult {
        data,
        text,
        warnings,
        errors,
        latency_ms,
        providers,
    } = command_result;

    let mut metadata = Metadata::new(providers, latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;

    Ok(CommandOutput {
        envelope: Envelope::with_errors(meta, data, errors)?,
        text,
    })
}

pub async fn run_chat(cli: &Cli, context: &Context) -> Result<ExitCode, CliError> {
    chat::run(cli, context).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[tokio::test]
    async fn plans_use_tiers_from_config_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file should be created");
        file.write_all(
            b"plan_tiers:\n  - label: entry\n    max_income: 1000\n    plans: [Starter]\n  - label: open\n    plans: [Everything]\n",
        )
        .expect("temp file should be writable");
        let path = file.path().to_string_lossy().into_owned();

        let cli = parse(&["finwell", "--config", &path, "--offline", "plans", "4000"]);
        let context = Context::from_cli(&cli).expect("config should load");
        let output = run(&cli, &context).await.expect("plans should succeed");

        assert_eq!(output.envelope.data["tier"], "open");
        assert_eq!(output.envelope.data["plans"][0], "Everything");
        assert!(output.text.contains("(open tier)"));
        assert!(output.envelope.meta.warnings.is_empty());
    }

    #[tokio::test]
    async fn negative_income_is_a_validation_error() {
        let cli = parse(&["finwell", "plans", "--", "-5"]);
        let context = Context::from_cli(&cli).expect("default config");

        let error = run(&cli, &context).await.err().expect("must fail");

        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn missing_config_file_maps_to_io_exit_code() {
        let cli = parse(&["finwell", "--config", "/nonexistent/finwell.yaml", "classify", "btc"]);

        let error = Context::from_cli(&cli).err().expect("must fail");

        assert_eq!(error.exit_code(), 10);
    }
}
