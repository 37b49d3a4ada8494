use std::time::Instant;

use finwell_core::{AggregateDiagnostics, AggregateResult, LexiconScorer, MetricAggregator, MetricSample};
use serde::Serialize;

use crate::cli::ScoreArgs;
use crate::error::CliError;

use super::classify::elapsed_ms;
use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct ScoreResponseData {
    aggregate: AggregateResult,
    diagnostics: AggregateDiagnostics,
}

pub fn run(args: &ScoreArgs, context: &Context) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let samples = args
        .texts
        .iter()
        .map(|text| MetricSample::text(text.as_str(), args.source.as_str()))
        .collect::<Vec<_>>();

    let scorer = LexiconScorer::new();
    let (aggregate, diagnostics) = MetricAggregator::new(context.config.max_sources)
        .aggregate_with_diagnostics(&samples, |text| scorer.score(text));

    let mut warnings = Vec::new();
    if diagnostics.skipped > 0 {
        warnings.push(format!(
            "{} of {} texts could not be scored",
            diagnostics.skipped, diagnostics.total
        ));
    }

    let text = format!(
        "score: {:.2} ({})\nsamples: {}\nsources: {}",
        aggregate.score,
        aggregate.category.label(),
        aggregate.sample_size,
        aggregate.sources.join(", ")
    );
    let data = serde_json::to_value(ScoreResponseData {
        aggregate,
        diagnostics,
    })?;

    Ok(CommandResult::ok(data, text)
        .with_warnings(warnings)
        .with_latency(elapsed_ms(started)))
}
