use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, fetch_body, ProviderId, SourceError};
use crate::config::ProviderSettings;
use crate::http_client::{HttpClient, HttpRequest};
use crate::Symbol;

/// Latest daily quote for one equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityQuote {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub high: f64,
    pub low: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_trading_day: Option<String>,
}

/// Alpha Vantage adapter for the `GLOBAL_QUOTE` endpoint.
pub struct AlphaVantageClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl AlphaVantageClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_ms: 5_000,
        }
    }

    pub fn from_settings(http: Arc<dyn HttpClient>, settings: &ProviderSettings) -> Self {
        Self {
            timeout_ms: settings.timeout_ms,
            ..Self::new(
                http,
                settings.alphavantage_base_url.as_str(),
                settings.alphavantage_api_key.as_str(),
            )
        }
    }

    pub async fn global_quote(&self, symbol: &Symbol) -> Result<EquityQuote, SourceError> {
        let request = HttpRequest::get(self.base_url.as_str())
            .with_query("function", "GLOBAL_QUOTE")
            .with_query("symbol", symbol.as_str())
            .with_query("apikey", &self.api_key)
            .with_timeout_ms(self.timeout_ms);

        let body = fetch_body(self.http.as_ref(), ProviderId::Alphavantage, request).await?;
        let quote = parse_global_quote(&body, symbol)?;
        debug!(symbol = %symbol, price = quote.price, "fetched alphavantage quote");
        Ok(quote)
    }
}

/// Parses a `GLOBAL_QUOTE` body. Alpha Vantage reports throttling as a 200 with a `Note` or
/// `Information` field; those become rate-limit errors.
pub fn parse_global_quote(body: &str, symbol: &Symbol) -> Result<EquityQuote, SourceError> {
    let payload: Value = decode(ProviderId::Alphavantage, body)?;

    if let Some(message) = payload.get("Error Message").and_then(Value::as_str) {
        return Err(SourceError::invalid_request(format!(
            "alphavantage rejected {symbol}: {message}"
        )));
    }

    let quote = payload
        .get("Global Quote")
        .and_then(Value::as_object)
        .filter(|quote| !quote.is_empty());

    let Some(quote) = quote else {
        if let Some(note) = payload
            .get("Note")
            .or_else(|| payload.get("Information"))
            .and_then(Value::as_str)
        {
            return Err(SourceError::rate_limited(format!("alphavantage: {note}")));
        }
        return Err(SourceError::unavailable(format!(
            "no quote data in alphavantage response for {symbol}"
        )));
    };

    let raw: RawGlobalQuote = serde_json::from_value(Value::Object(quote.clone())).map_err(|error| {
        SourceError::invalid_response(format!("malformed alphavantage quote: {error}"))
    })?;

    let price = number(raw.price.as_deref()).ok_or_else(|| {
        SourceError::invalid_response(format!("alphavantage quote for {symbol} has no price"))
    })?;

    Ok(EquityQuote {
        symbol: symbol.clone(),
        price,
        change: number(raw.change.as_deref()).unwrap_or_default(),
        change_percent: number(raw.change_percent.as_deref().map(|value| value.trim_end_matches('%')))
            .unwrap_or_default(),
        volume: number(raw.volume.as_deref()).unwrap_or_default(),
        high: number(raw.high.as_deref()).unwrap_or(price),
        low: number(raw.low.as_deref()).unwrap_or(price),
        latest_trading_day: raw.latest_trading_day,
    })
}

fn number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

#[derive(Debug, Deserialize)]
struct RawGlobalQuote {
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "09. change", default)]
    change: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "03. high", default)]
    high: Option<String>,
    #[serde(rename = "04. low", default)]
    low: Option<String>,
    #[serde(rename = "07. latest trading day", default)]
    latest_trading_day: Option<String>,
}
