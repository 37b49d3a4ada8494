//! Derived market metrics and the synthetic sample texts built from them.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::numfmt::format_percent;

/// Direction of a price move over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    StrongUp,
    Up,
    Stable,
    Down,
    StrongDown,
}

impl PriceTrend {
    /// Daily thresholds: 5% strong, 2% mild.
    pub fn daily(change_pct: f64) -> Self {
        Self::with_thresholds(change_pct, 5.0, 2.0)
    }

    /// Weekly thresholds: 10% strong, 5% mild.
    pub fn weekly(change_pct: f64) -> Self {
        Self::with_thresholds(change_pct, 10.0, 5.0)
    }

    fn with_thresholds(change_pct: f64, strong: f64, mild: f64) -> Self {
        if change_pct > strong {
            Self::StrongUp
        } else if change_pct > mild {
            Self::Up
        } else if change_pct < -strong {
            Self::StrongDown
        } else if change_pct < -mild {
            Self::Down
        } else {
            Self::Stable
        }
    }

    pub const fn arrow(self) -> &'static str {
        match self {
            Self::StrongUp => "↑↑",
            Self::Up => "↑",
            Self::Stable => "→",
            Self::Down => "↓",
            Self::StrongDown => "↓↓",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::StrongUp => "strong upward",
            Self::Up => "upward",
            Self::Stable => "stable",
            Self::Down => "downward",
            Self::StrongDown => "strong downward",
        }
    }
}

impl Display for PriceTrend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.arrow(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCapTier {
    TopTier,
    LargeCap,
    MidCap,
    SmallCap,
}

impl MarketCapTier {
    pub fn from_market_cap(market_cap: f64) -> Self {
        if market_cap > 100e9 {
            Self::TopTier
        } else if market_cap > 10e9 {
            Self::LargeCap
        } else if market_cap > 1e9 {
            Self::MidCap
        } else {
            Self::SmallCap
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::TopTier => "a top-tier asset",
            Self::LargeCap => "a large-cap asset",
            Self::MidCap => "a mid-cap asset",
            Self::SmallCap => "a small-cap asset",
        }
    }
}

/// Trading interest read from 24h volume relative to market cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeInterest {
    VeryHigh,
    AboveAverage,
    Normal,
    Low,
}

impl VolumeInterest {
    /// `None` when the market cap is zero or either input is not finite.
    pub fn from_ratio(volume: f64, market_cap: f64) -> Option<Self> {
        if !volume.is_finite() || !market_cap.is_finite() || market_cap <= 0.0 {
            return None;
        }

        let ratio = volume / market_cap * 100.0;
        Some(if ratio > 15.0 {
            Self::VeryHigh
        } else if ratio > 10.0 {
            Self::AboveAverage
        } else if ratio < 3.0 {
            Self::Low
        } else {
            Self::Normal
        })
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryHigh => "very high trading activity",
            Self::AboveAverage => "above-average trading interest",
            Self::Normal => "normal trading volume",
            Self::Low => "low trading volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentIntensity {
    Strong,
    Moderate,
    Weak,
}

impl SentimentIntensity {
    pub fn from_score(score: f64) -> Self {
        let magnitude = score.abs();
        if magnitude > 0.5 {
            Self::Strong
        } else if magnitude < 0.2 {
            Self::Weak
        } else {
            Self::Moderate
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        }
    }
}

/// Bullish/bearish display scale. Never converted to or from the five-band category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMood {
    ExtremelyBullish,
    VeryBullish,
    Bullish,
    Neutral,
    Bearish,
    VeryBearish,
    ExtremelyBearish,
}

impl MarketMood {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::ExtremelyBullish
        } else if score > 0.4 {
            Self::VeryBullish
        } else if score > 0.1 {
            Self::Bullish
        } else if score > -0.1 {
            Self::Neutral
        } else if score > -0.4 {
            Self::Bearish
        } else if score > -0.7 {
            Self::VeryBearish
        } else {
            Self::ExtremelyBearish
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtremelyBullish => "Extremely Bullish",
            Self::VeryBullish => "Very Bullish",
            Self::Bullish => "Bullish",
            Self::Neutral => "Neutral",
            Self::Bearish => "Bearish",
            Self::VeryBearish => "Very Bearish",
            Self::ExtremelyBearish => "Extremely Bearish",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::ExtremelyBullish | Self::VeryBullish => "🚀",
            Self::Bullish => "📈",
            Self::Neutral => "➖",
            Self::Bearish => "📉",
            Self::VeryBearish | Self::ExtremelyBearish => "🔻",
        }
    }
}

/// Percent change from `first` to `last`; `None` when `first` is zero or not finite.
pub fn percent_change(first: f64, last: f64) -> Option<f64> {
    if !first.is_finite() || !last.is_finite() || first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Mean absolute day-over-day percent move.
pub fn average_volatility(prices: &[f64]) -> Option<f64> {
    let moves = prices
        .windows(2)
        .filter_map(|pair| percent_change(pair[0], pair[1]))
        .map(f64::abs)
        .collect::<Vec<_>>();

    if moves.is_empty() {
        return None;
    }
    Some(moves.iter().sum::<f64>() / moves.len() as f64)
}

/// Sentences describing a price and volume history, used as extra sentiment samples.
pub fn trend_texts(name: &str, prices: &[f64], volumes: &[f64]) -> Vec<String> {
    let mut texts = Vec::new();

    if let (Some(first), Some(last)) = (prices.first(), prices.last()) {
        if let Some(change) = percent_change(*first, *last) {
            let sentence = if change > 5.0 {
                format!(
                    "{name} price has increased significantly by {} over the past 14 days, showing strong bullish momentum.",
                    format_percent(change)
                )
            } else if change < -5.0 {
                format!(
                    "{name} price has decreased by {} over the past 14 days, indicating bearish pressure.",
                    format_percent(change)
                )
            } else {
                format!(
                    "{name} price has remained relatively stable over the past 14 days with {} change.",
                    format_percent(change)
                )
            };
            texts.push(sentence);
        }
    }

    if let Some(volatility) = average_volatility(prices) {
        if volatility > 5.0 {
            texts.push(format!(
                "{name} has shown high volatility with average daily price swings of {volatility:.2}%, indicating market uncertainty."
            ));
        } else if volatility < 1.0 {
            texts.push(format!(
                "{name} has been very stable with low volatility of {volatility:.2}%, suggesting market confidence."
            ));
        }
    }

    if let (Some(first), Some(last)) = (volumes.first(), volumes.last()) {
        if let Some(change) = percent_change(*first, *last) {
            if change > 50.0 {
                texts.push(format!(
                    "Trading volume for {name} has increased substantially by {}, showing growing market interest.",
                    format_percent(change)
                ));
            } else if change < -50.0 {
                texts.push(format!(
                    "Trading volume for {name} has decreased significantly by {}, suggesting waning interest.",
                    format_percent(change)
                ));
            }
        }
    }

    texts
}
