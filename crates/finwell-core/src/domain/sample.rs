use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Raw observation fed into the aggregator: free text to be scored, or a precomputed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

/// One observation and the label of where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub raw_value: SampleValue,
    pub source_label: String,
}

impl MetricSample {
    pub fn text(text: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            raw_value: SampleValue::Text(text.into()),
            source_label: source_label.into(),
        }
    }

    pub fn number(value: f64, source_label: impl Into<String>) -> Self {
        Self {
            raw_value: SampleValue::Number(value),
            source_label: source_label.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.raw_value {
            SampleValue::Text(text) => Some(text),
            SampleValue::Number(_) => None,
        }
    }
}

/// Five-band polarity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentCategory {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentCategory {
    pub const STRONG_THRESHOLD: f64 = 0.15;
    pub const MILD_THRESHOLD: f64 = 0.05;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::STRONG_THRESHOLD {
            Self::VeryPositive
        } else if score >= Self::MILD_THRESHOLD {
            Self::Positive
        } else if score <= -Self::STRONG_THRESHOLD {
            Self::VeryNegative
        } else if score <= -Self::MILD_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryPositive => "very_positive",
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::VeryNegative => "very_negative",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryPositive => "very positive",
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::VeryNegative => "very negative",
        }
    }
}

impl Display for SentimentCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics over the samples of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub score: f64,
    pub category: SentimentCategory,
    pub sample_size: usize,
    pub sources: Vec<String>,
}

impl AggregateResult {
    pub const NO_DATA: &'static str = "No data";

    /// Canonical result when nothing could be scored.
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            category: SentimentCategory::Neutral,
            sample_size: 0,
            sources: vec![String::from(Self::NO_DATA)],
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.sample_size == 0
    }
}
