use std::sync::Arc;
use std::time::Instant;

use finwell_core::IntentExtractor;

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

pub fn run(args: &QueryArgs, context: &Context) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let classification = IntentExtractor::new(Arc::clone(&context.config)).classify(&args.joined());

    let mut lines = vec![format!("domain: {}", classification.domain)];
    if let Some(entity) = &classification.entity {
        lines.push(format!("entity: {}", entity.display_name()));
    }
    if !classification.matched_keywords.is_empty() {
        lines.push(format!(
            "keywords: {}",
            classification
                .matched_keywords
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let data = serde_json::to_value(&classification)?;
    Ok(CommandResult::ok(data, lines.join("\n"))
        .with_latency(elapsed_ms(started)))
}

pub(super) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
