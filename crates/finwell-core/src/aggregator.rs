//! Mean-polarity aggregation over [`MetricSample`]s.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AggregateResult, MetricSample, SampleValue, SentimentCategory};

const PREVIEW_LEN: usize = 3;
const PREVIEW_CHARS: usize = 100;

/// Bookkeeping about one aggregation pass, kept apart from [`AggregateResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDiagnostics {
    pub total: usize,
    pub skipped: usize,
    /// First texts seen, each cut to 100 characters plus `...`.
    pub preview: Vec<String>,
}

/// Aggregator with a cap on the number of reported source labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricAggregator {
    max_sources: usize,
}

impl Default for MetricAggregator {
    fn default() -> Self {
        Self { max_sources: 5 }
    }
}

impl MetricAggregator {
    pub fn new(max_sources: usize) -> Self {
        Self {
            max_sources: max_sources.max(1),
        }
    }

    pub fn aggregate<F>(&self, samples: &[MetricSample], score_fn: F) -> AggregateResult
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.aggregate_with_diagnostics(samples, score_fn).0
    }

    pub fn aggregate_with_diagnostics<F>(
        &self,
        samples: &[MetricSample],
        score_fn: F,
    ) -> (AggregateResult, AggregateDiagnostics)
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut scores = Vec::with_capacity(samples.len());
        let mut sources: Vec<String> = Vec::new();
        let mut diagnostics = AggregateDiagnostics {
            total: samples.len(),
            ..AggregateDiagnostics::default()
        };

        for sample in samples {
            let score = match &sample.raw_value {
                SampleValue::Number(value) => Some(*value),
                SampleValue::Text(text) => {
                    if diagnostics.preview.len() < PREVIEW_LEN && !text.trim().is_empty() {
                        diagnostics.preview.push(preview(text));
                    }
                    if text.trim().is_empty() {
                        None
                    } else {
                        score_fn(text)
                    }
                }
            };

            match score.filter(|value| value.is_finite()) {
                Some(value) => {
                    scores.push(value);
                    if sources.len() < self.max_sources
                        && !sources.iter().any(|label| label == &sample.source_label)
                    {
                        sources.push(sample.source_label.clone());
                    }
                }
                None => diagnostics.skipped += 1,
            }
        }

        if scores.is_empty() {
            debug!(skipped = diagnostics.skipped, "no scorable samples");
            return (AggregateResult::empty(), diagnostics);
        }

        // Summed in sorted order so the mean does not depend on sample order.
        scores.sort_by(f64::total_cmp);
        let score = scores.iter().sum::<f64>() / scores.len() as f64;

        debug!(
            score,
            sample_size = scores.len(),
            skipped = diagnostics.skipped,
            "aggregated samples"
        );

        let result = AggregateResult {
            score,
            category: SentimentCategory::from_score(score),
            sample_size: scores.len(),
            sources,
        };
        (result, diagnostics)
    }
}

/// Aggregates with the default five-source cap.
pub fn aggregate<F>(samples: &[MetricSample], score_fn: F) -> AggregateResult
where
    F: Fn(&str) -> Option<f64>,
{
    MetricAggregator::default().aggregate(samples, score_fn)
}

fn preview(text: &str) -> String {
    let cut = text.chars().take(PREVIEW_CHARS).collect::<String>();
    format!("{cut}...")
}
