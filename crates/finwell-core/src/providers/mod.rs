//! Thin clients for the external data providers.
//!
//! Each client owns an `Arc<dyn HttpClient>` and exposes a few async calls plus pure `parse_*`
//! functions, so response handling can be tested without a transport.
//!
//! | Client | Provider | Used for |
//! |--------|----------|----------|
//! | [`CoinGeckoClient`] | CoinGecko | token price snapshot, price history |
//! | [`SolanaRpcClient`] | Solana JSON-RPC | wallet balance, signatures, token accounts |
//! | [`AlphaVantageClient`] | Alpha Vantage | equity quotes |
//! | [`LlmClient`] | ASI chat completions | narrative analysis |
//! | [`NewsClient`] | any JSON news feed | headline samples |

mod alphavantage;
mod coingecko;
mod llm;
mod news;
mod solana;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::http_client::{HttpClient, HttpRequest};
use crate::ValidationError;

pub use alphavantage::{parse_global_quote, AlphaVantageClient, EquityQuote};
pub use coingecko::{
    parse_coin, parse_market_chart, CoinGeckoClient, CommunityStats, MarketSeries, PriceSnapshot,
};
pub use llm::{parse_completion, LlmClient};
pub use news::{news_samples, NewsClient};
pub use solana::{
    explorer_address_url, explorer_tx_url, lamports_to_sol, AccountSummary, SignatureInfo,
    SolanaAction, SolanaRpcClient, TokenHolding, WalletBalance, LAMPORTS_PER_SOL,
};

/// Canonical identifiers of external providers, reported in envelopes and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Coingecko,
    Solana,
    Alphavantage,
    Asi,
    News,
}

impl ProviderId {
    pub const ALL: [Self; 5] = [
        Self::Coingecko,
        Self::Solana,
        Self::Alphavantage,
        Self::Asi,
        Self::News,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coingecko => "coingecko",
            Self::Solana => "solana",
            Self::Alphavantage => "alphavantage",
            Self::Asi => "asi",
            Self::News => "news",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "coingecko" => Ok(Self::Coingecko),
            "solana" => Ok(Self::Solana),
            "alphavantage" => Ok(Self::Alphavantage),
            "asi" => Ok(Self::Asi),
            "news" => Ok(Self::News),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

/// Provider error category used for retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    InvalidResponse,
    Internal,
}

/// Failure of a provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    /// Transport failure that must not be retried (e.g. offline mode).
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "provider.unavailable",
            SourceErrorKind::RateLimited => "provider.rate_limited",
            SourceErrorKind::InvalidRequest => "provider.invalid_request",
            SourceErrorKind::InvalidResponse => "provider.invalid_response",
            SourceErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl std::error::Error for SourceError {}

/// Sends `request` and returns the body of a 2xx response.
pub(crate) async fn fetch_body(
    http: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<String, SourceError> {
    let response = http.execute(request).await.map_err(|error| {
        let message = format!("{provider} transport error: {}", error.message());
        if error.retryable() {
            SourceError::unavailable(message)
        } else {
            SourceError::unreachable(message)
        }
    })?;

    match response.status {
        200..=299 => Ok(response.body),
        429 => Err(SourceError::rate_limited(format!(
            "{provider} rate limit exceeded"
        ))),
        400..=499 => Err(SourceError::invalid_request(format!(
            "{provider} returned status {}",
            response.status
        ))),
        status => Err(SourceError::unavailable(format!(
            "{provider} returned status {status}"
        ))),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|error| {
        SourceError::invalid_response(format!("failed to parse {provider} response: {error}"))
    })
}

pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<T, SourceError> {
    let body = fetch_body(http, provider, request).await?;
    decode(provider, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_str() {
        for provider in ProviderId::ALL {
            assert_eq!(provider.as_str().parse::<ProviderId>(), Ok(provider));
        }
    }

    #[test]
    fn error_codes_are_namespaced() {
        assert_eq!(SourceError::rate_limited("x").code(), "provider.rate_limited");
        assert!(SourceError::rate_limited("x").retryable());
        assert!(!SourceError::invalid_response("x").retryable());
    }
}
