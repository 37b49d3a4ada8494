//! Canonical domain types shared by the extractor, aggregator and formatter.

mod intent;
mod sample;
mod symbol;
mod timestamp;

pub use intent::{ClassificationResult, Domain, Entity, HealthTopic, Query};
pub use sample::{AggregateResult, MetricSample, SampleValue, SentimentCategory};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
