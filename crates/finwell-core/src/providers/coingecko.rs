use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decode, fetch_body, ProviderId, SourceError};
use crate::config::ProviderSettings;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::numfmt::format_count;
use crate::UtcDateTime;

const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const CHART_DAYS: u32 = 14;

/// Social reach reported by CoinGecko.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityStats {
    pub twitter_followers: u64,
    pub reddit_subscribers: u64,
    pub telegram_users: u64,
}

impl CommunityStats {
    /// Sentences about large communities, used as extra sentiment samples.
    pub fn texts(&self, symbol: &str) -> Vec<String> {
        let mut texts = Vec::new();
        if self.twitter_followers > 100_000 {
            texts.push(format!(
                "{symbol} has a large Twitter following with {} followers",
                format_count(self.twitter_followers as f64)
            ));
        }
        if self.reddit_subscribers > 50_000 {
            texts.push(format!(
                "{symbol} has an active Reddit community with {} subscribers",
                format_count(self.reddit_subscribers as f64)
            ));
        }
        if self.telegram_users > 10_000 {
            texts.push(format!(
                "{symbol} has a significant Telegram presence with {} users",
                format_count(self.telegram_users as f64)
            ));
        }
        texts
    }
}

/// Current market state of one token. Missing numeric fields read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub id: String,
    /// Upper-case symbol, e.g. `BTC`.
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub change_24h: f64,
    pub change_7d: f64,
    pub change_30d: f64,
    pub last_updated: UtcDateTime,
    pub community: CommunityStats,
}

/// Daily price and volume closes, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

pub struct CoinGeckoClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl CoinGeckoClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: None,
            timeout_ms: 15_000,
        }
    }

    pub fn from_settings(http: Arc<dyn HttpClient>, settings: &ProviderSettings) -> Self {
        Self {
            api_key: settings.coingecko_api_key.clone(),
            timeout_ms: settings.timeout_ms,
            ..Self::new(http, settings.coingecko_base_url.as_str())
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, path: &str) -> HttpRequest {
        let request =
            HttpRequest::get(format!("{}{path}", self.base_url)).with_timeout_ms(self.timeout_ms);
        match &self.api_key {
            Some(key) => request.with_auth(&HttpAuth::Header {
                name: String::from(API_KEY_HEADER),
                value: key.clone(),
            }),
            None => request,
        }
    }

    /// `GET /coins/{id}` with community data.
    pub async fn coin(&self, id: &str, symbol: &str) -> Result<PriceSnapshot, SourceError> {
        let request = self
            .request(&format!("/coins/{id}"))
            .with_query("localization", "false")
            .with_query("tickers", "false")
            .with_query("community_data", "true")
            .with_query("developer_data", "false");

        let body = fetch_body(self.http.as_ref(), ProviderId::Coingecko, request).await?;
        let snapshot = parse_coin(&body, id, symbol)?;
        debug!(id, price = snapshot.price_usd, "fetched coingecko snapshot");
        Ok(snapshot)
    }

    /// `GET /coins/{id}/market_chart` over the last 14 days.
    pub async fn market_chart(&self, id: &str) -> Result<MarketSeries, SourceError> {
        let request = self
            .request(&format!("/coins/{id}/market_chart"))
            .with_query("vs_currency", "usd")
            .with_query("days", &CHART_DAYS.to_string());

        let body = fetch_body(self.http.as_ref(), ProviderId::Coingecko, request).await?;
        parse_market_chart(&body)
    }
}

/// Parses a `/coins/{id}` payload. A body without `market_data` is rejected.
pub fn parse_coin(body: &str, id: &str, symbol: &str) -> Result<PriceSnapshot, SourceError> {
    let raw: RawCoin = decode(ProviderId::Coingecko, body)?;
    let Some(market) = raw.market_data else {
        return Err(SourceError::invalid_response(
            "unexpected coingecko response structure: missing market_data",
        ));
    };

    let symbol = raw
        .symbol
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| symbol.to_owned())
        .to_ascii_uppercase();
    let name = raw
        .name
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| symbol.clone());
    let last_updated = raw
        .last_updated
        .as_deref()
        .and_then(|value| UtcDateTime::parse(value).ok())
        .unwrap_or_else(UtcDateTime::now);
    let community = raw
        .community_data
        .map(|community| CommunityStats {
            twitter_followers: community.twitter_followers.unwrap_or_default(),
            reddit_subscribers: community.reddit_subscribers.unwrap_or_default(),
            telegram_users: community.telegram_channel_user_count.unwrap_or_default(),
        })
        .unwrap_or_default();

    Ok(PriceSnapshot {
        id: raw.id.unwrap_or_else(|| id.to_owned()),
        symbol,
        name,
        price_usd: usd(&market.current_price),
        market_cap: usd(&market.market_cap),
        volume_24h: usd(&market.total_volume),
        change_24h: market.price_change_percentage_24h.unwrap_or_default(),
        change_7d: usd(&market.price_change_percentage_7d_in_currency),
        change_30d: usd(&market.price_change_percentage_30d_in_currency),
        last_updated,
        community,
    })
}

pub fn parse_market_chart(body: &str) -> Result<MarketSeries, SourceError> {
    let raw: RawMarketChart = decode(ProviderId::Coingecko, body)?;
    Ok(MarketSeries {
        prices: raw.prices.into_iter().map(|(_, price)| price).collect(),
        volumes: raw.total_volumes.into_iter().map(|(_, volume)| volume).collect(),
    })
}

fn usd(value: &Option<UsdValue>) -> f64 {
    value
        .as_ref()
        .and_then(|value| value.usd)
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct RawCoin {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    market_data: Option<RawMarketData>,
    #[serde(default)]
    community_data: Option<RawCommunity>,
}

#[derive(Debug, Deserialize)]
struct RawMarketData {
    #[serde(default)]
    current_price: Option<UsdValue>,
    #[serde(default)]
    market_cap: Option<UsdValue>,
    #[serde(default)]
    total_volume: Option<UsdValue>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_7d_in_currency: Option<UsdValue>,
    #[serde(default)]
    price_change_percentage_30d_in_currency: Option<UsdValue>,
}

#[derive(Debug, Deserialize)]
struct UsdValue {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCommunity {
    #[serde(default)]
    twitter_followers: Option<u64>,
    #[serde(default)]
    reddit_subscribers: Option<u64>,
    #[serde(default)]
    telegram_channel_user_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawMarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
    #[serde(default)]
    total_volumes: Vec<(f64, f64)>,
}
