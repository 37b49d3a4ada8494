//! Per-domain data collection.
//!
//! A [`DomainHandler`] turns a [`ClassificationResult`] into key facts, sentiment samples and an
//! `Analysis` narrative. Handlers never fail for missing optional data: secondary lookups that
//! fail become warnings, and only the primary lookup of a report is propagated as an error.

mod crypto;
mod health;
mod insurance;
mod stock;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::aggregator::MetricAggregator;
use crate::formatter::{FactValue, Facts};
use crate::providers::{LlmClient, ProviderId, SourceError};
use crate::sentiment::LexiconScorer;
use crate::{AggregateResult, ClassificationResult, Domain, MetricSample};

pub use crypto::{crypto_fallback_analysis, CryptoHandler};
pub use health::{health_fallback_guidance, HealthHandler};
pub use insurance::{insurance_fallback_analysis, InsuranceHandler};
pub use stock::{stock_fallback_analysis, StockHandler};

/// Boxed future returned by [`DomainHandler::handle`].
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HandlerOutput, SourceError>> + Send + 'a>>;

/// Collects the data behind one domain's report.
pub trait DomainHandler: Send + Sync {
    fn domain(&self) -> Domain;

    fn handle<'a>(&'a self, classification: &'a ClassificationResult) -> HandlerFuture<'a>;
}

/// Facts, samples and diagnostics gathered by a handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandlerOutput {
    pub facts: Facts,
    pub samples: Vec<MetricSample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderId>,
}

impl HandlerOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fact(&mut self, name: impl Into<String>, value: FactValue) {
        self.facts.insert(name, value);
    }

    pub fn push_samples<I>(&mut self, texts: I, source_label: &str)
    where
        I: IntoIterator<Item = String>,
    {
        self.samples.extend(
            texts
                .into_iter()
                .map(|text| MetricSample::text(text, source_label)),
        );
    }

    /// Records a failed secondary lookup.
    pub fn push_warning(&mut self, context: &str, error: &SourceError) {
        warn!(context, error = %error, "optional provider lookup failed");
        self.warnings.push(format!("{context}: {error}"));
    }

    pub fn used(&mut self, provider: ProviderId) {
        if !self.providers.contains(&provider) {
            self.providers.push(provider);
        }
    }
}

/// Scores samples the same way the dispatcher will, so narratives can quote the sentiment.
#[derive(Debug, Clone)]
pub struct SampleScorer {
    aggregator: MetricAggregator,
    scorer: Arc<LexiconScorer>,
}

impl Default for SampleScorer {
    fn default() -> Self {
        Self::new(MetricAggregator::default(), Arc::new(LexiconScorer::new()))
    }
}

impl SampleScorer {
    pub fn new(aggregator: MetricAggregator, scorer: Arc<LexiconScorer>) -> Self {
        Self { aggregator, scorer }
    }

    pub fn aggregate(&self, samples: &[MetricSample]) -> AggregateResult {
        self.aggregator
            .aggregate(samples, |text| self.scorer.score(text))
    }
}

/// Asks the LLM for an analysis and falls back to `fallback` when it is disabled or fails.
pub(crate) async fn narrate<F>(
    llm: Option<&LlmClient>,
    system: &str,
    prompt: &str,
    output: &mut HandlerOutput,
    fallback: F,
) -> String
where
    F: FnOnce() -> String,
{
    let Some(llm) = llm else {
        return fallback();
    };

    match llm.complete(Some(system), prompt).await {
        Ok(analysis) => {
            output.used(ProviderId::Asi);
            analysis
        }
        Err(error) => {
            output.push_warning("llm analysis unavailable, using fallback", &error);
            fallback()
        }
    }
}
