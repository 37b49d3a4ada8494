use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{fetch_json, ProviderId, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::MetricSample;

/// Fetches a JSON news feed and keeps the items that mention a token.
pub struct NewsClient {
    http: Arc<dyn HttpClient>,
    url_template: String,
    timeout_ms: u64,
}

impl NewsClient {
    /// `url_template` may contain `{symbol}` and `{id}` placeholders.
    pub fn new(http: Arc<dyn HttpClient>, url_template: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            http,
            url_template: url_template.into(),
            timeout_ms,
        }
    }

    pub async fn samples(&self, symbol: &str, id: &str) -> Result<Vec<MetricSample>, SourceError> {
        let url = self
            .url_template
            .replace("{symbol}", &urlencoding::encode(symbol))
            .replace("{id}", &urlencoding::encode(id));
        let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);

        let payload: Value = fetch_json(self.http.as_ref(), ProviderId::News, request).await?;
        let samples = news_samples(&payload, symbol, id);
        debug!(symbol, count = samples.len(), "collected news samples");
        Ok(samples)
    }
}

/// Extracts text samples from the common news feed shapes: `results` (CryptoPanic), `data`
/// (CoinGecko news), `status_updates`, `Data` (CryptoCompare) and `articles` (NewsAPI).
///
/// Items are kept when their lower-cased text contains the symbol or the canonical id.
pub fn news_samples(payload: &Value, symbol: &str, id: &str) -> Vec<MetricSample> {
    let symbol = symbol.trim().to_lowercase();
    let id = id.trim().to_lowercase();
    let mentions = |text: &str| {
        (!symbol.is_empty() && text.contains(symbol.as_str()))
            || (!id.is_empty() && text.contains(id.as_str()))
    };

    let mut samples = Vec::new();

    if let Some(items) = payload.get("results").and_then(Value::as_array) {
        collect(&mut samples, items, &mentions, |item| field(item, "title"), |item| {
            nested(item, "source", "title").unwrap_or_else(|| String::from("News"))
        });
    } else if let Some(items) = payload.get("data").and_then(Value::as_array) {
        collect(
            &mut samples,
            items,
            &mentions,
            |item| joined(item, "title", "description"),
            |_| String::from("CoinGecko"),
        );
    } else if let Some(items) = payload.get("status_updates").and_then(Value::as_array) {
        collect(
            &mut samples,
            items,
            &mentions,
            |item| {
                let project = nested(item, "project", "name").unwrap_or_default();
                format!("{} {project}", field(item, "description"))
            },
            |_| String::from("CoinGecko Status"),
        );
    } else if let Some(items) = payload.get("Data").and_then(Value::as_array) {
        collect(
            &mut samples,
            items,
            &mentions,
            |item| joined(item, "title", "body"),
            |item| {
                item.get("source")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| String::from("CryptoCompare"))
            },
        );
    } else if let Some(items) = payload.get("articles").and_then(Value::as_array) {
        collect(
            &mut samples,
            items,
            &mentions,
            |item| joined(item, "title", "description"),
            |item| nested(item, "source", "name").unwrap_or_else(|| String::from("NewsAPI")),
        );
    }

    samples
}

fn collect<T, L>(
    samples: &mut Vec<MetricSample>,
    items: &[Value],
    mentions: &dyn Fn(&str) -> bool,
    text_of: T,
    label_of: L,
) where
    T: Fn(&Value) -> String,
    L: Fn(&Value) -> String,
{
    for item in items {
        let text = text_of(item).trim().to_lowercase();
        if !text.is_empty() && mentions(&text) {
            samples.push(MetricSample::text(text, label_of(item)));
        }
    }
}

fn field(item: &Value, name: &str) -> String {
    item.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn joined(item: &Value, first: &str, second: &str) -> String {
    format!("{} {}", field(item, first), field(item, second))
}

fn nested(item: &Value, outer: &str, inner: &str) -> Option<String> {
    item.get(outer)
        .and_then(|value| value.get(inner))
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::providers::testing::RecordingHttpClient;

    #[test]
    fn keeps_only_items_mentioning_the_token() {
        let payload = json!({
            "results": [
                {"title": "Solana hits new high", "source": {"title": "CoinDesk"}},
                {"title": "Dogecoin rallies"},
                {"title": "SOL staking grows"}
            ]
        });

        let samples = news_samples(&payload, "sol", "solana");

        let labels = samples
            .iter()
            .map(|sample| sample.source_label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["CoinDesk", "News"]);
        assert_eq!(samples[0].as_text(), Some("solana hits new high"));
    }

    #[test]
    fn reads_newsapi_articles_with_descriptions() {
        let payload = json!({
            "articles": [
                {"title": "Markets wobble", "description": "Bitcoin slips below support",
                 "source": {"name": "Reuters"}}
            ]
        });

        let samples = news_samples(&payload, "btc", "bitcoin");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].source_label, "Reuters");
        assert_eq!(
            samples[0].as_text(),
            Some("markets wobble bitcoin slips below support")
        );
    }

    #[test]
    fn unknown_shape_yields_no_samples() {
        let payload = json!({"items": [{"title": "bitcoin"}]});
        assert!(news_samples(&payload, "btc", "bitcoin").is_empty());
    }

    #[tokio::test]
    async fn fills_url_template_placeholders() {
        let http = Arc::new(RecordingHttpClient::json(r#"{"data": []}"#));
        let client = NewsClient::new(http.clone(), "https://news.example.test/{id}?q={symbol}", 1_000);

        let samples = client.samples("eth", "ethereum").await.expect("feed should load");

        assert!(samples.is_empty());
        assert_eq!(
            http.recorded_requests()[0].url,
            "https://news.example.test/ethereum?q=eth"
        );
    }
}
