use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use finwell_tests::{
    lamports_to_sol, news_samples, parse_coin, parse_completion, parse_global_quote,
    AlphaVantageClient, Arc, CoinGeckoClient, HttpClient, HttpError, HttpMethod, HttpRequest,
    HttpResponse, LlmClient, NewsClient, ProviderId, RetryConfig, SolanaRpcClient, SourceError,
    SourceErrorKind, Symbol,
};
use serde_json::json;

const ADDRESS: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

/// Returns the same canned outcome for every request.
struct FixedHttpClient {
    outcome: Result<HttpResponse, HttpError>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FixedHttpClient {
    fn status(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(HttpResponse::with_status(status, body)),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: HttpError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .last()
            .cloned()
            .expect("at least one request was sent")
    }
}

impl HttpClient for FixedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .push(request);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

type ProviderCall =
    fn(Arc<dyn HttpClient>) -> Pin<Box<dyn Future<Output = Result<(), SourceError>> + Send>>;

struct ProviderCase {
    id: ProviderId,
    call: ProviderCall,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Coingecko,
            call: |http| {
                Box::pin(async move {
                    CoinGeckoClient::new(http, "https://cg.test/api/v3")
                        .coin("bitcoin", "btc")
                        .await
                        .map(|_| ())
                })
            },
        },
        ProviderCase {
            id: ProviderId::Solana,
            call: |http| {
                Box::pin(async move {
                    SolanaRpcClient::new(http, "https://rpc.test")
                        .balance(ADDRESS)
                        .await
                        .map(|_| ())
                })
            },
        },
        ProviderCase {
            id: ProviderId::Alphavantage,
            call: |http| {
                Box::pin(async move {
                    let symbol = Symbol::parse("AAPL").expect("valid symbol");
                    AlphaVantageClient::new(http, "https://av.test/query", "demo")
                        .global_quote(&symbol)
                        .await
                        .map(|_| ())
                })
            },
        },
        ProviderCase {
            id: ProviderId::Asi,
            call: |http| {
                Box::pin(async move {
                    LlmClient::new(http, "https://llm.test/v1/chat/completions", "asi1-mini", "sk")
                        .with_retry(RetryConfig::fixed(Duration::from_millis(1), 1))
                        .complete(None, "prompt")
                        .await
                        .map(|_| ())
                })
            },
        },
        ProviderCase {
            id: ProviderId::News,
            call: |http| {
                Box::pin(async move {
                    NewsClient::new(http, "https://news.test/{symbol}", 1_000)
                        .samples("btc", "bitcoin")
                        .await
                        .map(|_| ())
                })
            },
        },
    ]
}

#[tokio::test]
async fn every_provider_maps_http_429_to_rate_limited() {
    for case in provider_cases() {
        let http = FixedHttpClient::status(429, "{}");

        let error = (case.call)(http)
            .await
            .expect_err("429 must fail");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited, "provider {}", case.id);
        assert!(error.retryable(), "provider {}", case.id);
    }
}

#[tokio::test]
async fn every_provider_maps_server_errors_to_retryable_unavailable() {
    for case in provider_cases() {
        let http = FixedHttpClient::status(503, "upstream down");

        let error = (case.call)(http)
            .await
            .expect_err("503 must fail");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "provider {}", case.id);
        assert!(error.retryable(), "provider {}", case.id);
        assert!(
            error.message().contains(case.id.as_str()),
            "provider {} message: {}",
            case.id,
            error.message()
        );
    }
}

#[tokio::test]
async fn every_provider_treats_refused_transport_as_not_retryable() {
    for case in provider_cases() {
        let http = FixedHttpClient::failing(HttpError::non_retryable("offline mode"));

        let error = (case.call)(http)
            .await
            .expect_err("refused transport must fail");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "provider {}", case.id);
        assert!(!error.retryable(), "provider {}", case.id);
        assert_eq!(error.code(), "provider.unavailable");
    }
}

#[tokio::test]
async fn every_provider_rejects_non_json_bodies() {
    for case in provider_cases() {
        let http = FixedHttpClient::status(200, "<html>maintenance</html>");

        let error = (case.call)(http)
            .await
            .expect_err("html body must fail");

        assert_eq!(
            error.kind(),
            SourceErrorKind::InvalidResponse,
            "provider {}",
            case.id
        );
    }
}

#[tokio::test]
async fn solana_balance_posts_json_rpc_request() {
    let http = FixedHttpClient::status(200, r#"{"jsonrpc":"2.0","id":1,"result":{"value":2500000000}}"#);
    let client = SolanaRpcClient::new(http.clone(), "https://rpc.test");

    let balance = client.balance(ADDRESS).await.expect("balance parses");

    assert_eq!(balance.lamports, 2_500_000_000);
    assert!((balance.sol - 2.5).abs() < f64::EPSILON);
    let request = http.last_request();
    assert_eq!(request.method, HttpMethod::Post);
    let body: serde_json::Value =
        serde_json::from_str(request.body.as_deref().expect("rpc body")).expect("json body");
    assert_eq!(body["method"], "getBalance");
    assert_eq!(body["params"][0], ADDRESS);
}

#[tokio::test]
async fn solana_rpc_error_is_an_invalid_request() {
    let http = FixedHttpClient::status(
        200,
        r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#,
    );

    let error = SolanaRpcClient::new(http, "https://rpc.test")
        .balance(ADDRESS)
        .await
        .expect_err("rpc error must fail");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert!(error.message().contains("-32602"));
}

#[test]
fn coingecko_payload_without_market_data_is_rejected() {
    let error = parse_coin(r#"{"id":"bitcoin","symbol":"btc"}"#, "bitcoin", "btc")
        .expect_err("market data is required");

    assert_eq!(error.kind(), SourceErrorKind::InvalidResponse);
}

#[test]
fn coingecko_snapshot_uppercases_symbol_and_defaults_missing_numbers() {
    let body = r#"{"symbol":"eth","name":"Ethereum","market_data":{"current_price":{"usd":2975.5}}}"#;

    let snapshot = parse_coin(body, "ethereum", "eth").expect("snapshot parses");

    assert_eq!(snapshot.symbol, "ETH");
    assert_eq!(snapshot.id, "ethereum");
    assert!((snapshot.price_usd - 2975.5).abs() < f64::EPSILON);
    assert_eq!(snapshot.market_cap, 0.0);
    assert_eq!(snapshot.change_24h, 0.0);
}

#[test]
fn alphavantage_throttle_note_is_rate_limited() {
    let symbol = Symbol::parse("MSFT").expect("valid symbol");

    let error = parse_global_quote(
        r#"{"Note":"Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        &symbol,
    )
    .expect_err("throttle note must fail");

    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
}

#[test]
fn alphavantage_quote_strips_percent_sign() {
    let symbol = Symbol::parse("MSFT").expect("valid symbol");
    let body = r#"{"Global Quote":{"05. price":"415.20","10. change percent":"-1.0500%","06. volume":"1204332"}}"#;

    let quote = parse_global_quote(body, &symbol).expect("quote parses");

    assert!((quote.change_percent + 1.05).abs() < 1e-9);
    assert!((quote.high - 415.2).abs() < f64::EPSILON);
    assert_eq!(quote.volume, 1_204_332.0);
}

#[test]
fn llm_completion_is_trimmed() {
    let reply = parse_completion(r#"{"choices":[{"message":{"content":"\n Bullish. \n"}}]}"#)
        .expect("completion parses");

    assert_eq!(reply, "Bullish.");
}

#[test]
fn news_feed_keeps_only_mentions_of_the_token() {
    let payload = json!({
        "articles": [
            {"title": "Bitcoin ETF inflows climb", "description": "", "source": {"name": "Reuters"}},
            {"title": "Oil prices slip", "description": "energy markets"},
            {"title": "BTC miners expand", "description": "hashrate record"}
        ]
    });

    let samples = news_samples(&payload, "btc", "bitcoin");

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].source_label, "Reuters");
    assert_eq!(samples[1].source_label, "NewsAPI");
    assert_eq!(lamports_to_sol(1_000_000_000), 1.0);
}
