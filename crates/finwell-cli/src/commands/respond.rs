use finwell_core::Query;

use crate::cli::RespondArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

pub async fn run(args: &RespondArgs, context: &Context) -> Result<CommandResult, CliError> {
    let mut query = Query::new(args.query.joined());
    if let Some(sender) = &args.sender {
        query = query.with_sender(sender.as_str());
    }

    let outcome = context.dispatcher().respond(&query).await;
    let text = outcome.response.text.clone();
    let warnings = outcome.warnings.clone();
    let providers = outcome.providers.clone();
    let latency_ms = outcome.latency_ms;
    let errors = outcome.failure.iter().cloned().collect::<Vec<_>>();
    let data = serde_json::to_value(&outcome)?;

    Ok(CommandResult::ok(data, text)
        .with_errors(errors)
        .with_warnings(warnings)
        .with_providers(providers)
        .with_latency(latency_ms))
}
