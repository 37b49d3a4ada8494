//! Behavior-driven tests for end-to-end query journeys
//!
//! These tests verify HOW a query travels through classification, provider
//! lookups, aggregation and formatting, using a scripted transport instead of
//! the network.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use finwell_core::{
    ChatMessage, Dispatcher, Domain, Facts, FollowUp, HttpClient, HttpError, HttpMethod,
    HttpRequest, HttpResponse, MessageContent, OfflineHttpClient, PipelineConfig,
    ProviderId, ProviderSettings, Query,
};

const COIN: &str = r#"{
    "id": "bitcoin",
    "symbol": "btc",
    "name": "Bitcoin",
    "market_data": {
        "current_price": {"usd": 64250.12},
        "market_cap": {"usd": 1262000000000},
        "total_volume": {"usd": 35100000000},
        "price_change_percentage_24h": 3.1,
        "price_change_percentage_7d_in_currency": {"usd": 12.4}
    },
    "community_data": {"twitter_followers": 6500000}
}"#;

const MARKET_CHART: &str = r#"{
    "prices": [[1709251200000, 60000.0], [1709337600000, 62000.0], [1709424000000, 64250.12]],
    "total_volumes": [[1709251200000, 30000000000.0], [1709424000000, 35100000000.0]]
}"#;

const GLOBAL_QUOTE: &str = r#"{
    "Global Quote": {
        "01. symbol": "AAPL",
        "03. high": "172.10",
        "04. low": "169.80",
        "05. price": "171.50",
        "06. volume": "51234000",
        "07. latest trading day": "2024-03-05",
        "09. change": "2.10",
        "10. change percent": "1.2397%"
    }
}"#;

const BALANCE: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":1500000000}}"#;

const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

/// Answers by URL pattern and keeps every request it saw.
#[derive(Default)]
struct ScriptedHttpClient {
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    fn respond_to(request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        if request.method == HttpMethod::Post && request.url.contains("rpc.test") {
            return Ok(HttpResponse::ok_json(BALANCE));
        }
        if request.url.contains("/coins/bitcoin/market_chart") {
            return Ok(HttpResponse::ok_json(MARKET_CHART));
        }
        if request.url.contains("/coins/bitcoin?") {
            return Ok(HttpResponse::ok_json(COIN));
        }
        if request.url.contains("function=GLOBAL_QUOTE") {
            return Ok(HttpResponse::ok_json(GLOBAL_QUOTE));
        }
        Ok(HttpResponse::with_status(404, "{}"))
    }

    fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = Self::respond_to(&request);
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .push(request);
        Box::pin(async move { response })
    }
}

fn settings() -> ProviderSettings {
    ProviderSettings {
        coingecko_base_url: String::from("https://cg.test/api/v3"),
        solana_rpc_url: String::from("https://rpc.test"),
        alphavantage_base_url: String::from("https://av.test/query"),
        ..ProviderSettings::default()
    }
}

fn dispatcher(http: Arc<dyn HttpClient>) -> Dispatcher {
    Dispatcher::with_default_handlers(Arc::new(PipelineConfig::default()), &settings(), http)
}

// =============================================================================
// Crypto Journeys
// =============================================================================

#[tokio::test]
async fn when_user_asks_bitcoin_price_system_builds_full_crypto_report() {
    // Given: A dispatcher over a transport that knows CoinGecko
    let http = Arc::new(ScriptedHttpClient::default());
    let dispatcher = dispatcher(http.clone());
    for domain in [Domain::Crypto, Domain::Stock, Domain::Insurance, Domain::Health] {
        assert!(dispatcher.has_handler(domain), "missing handler for {domain}");
    }

    // When: The user asks about bitcoin
    let outcome = dispatcher.respond(&Query::new("bitcoin price today")).await;

    // Then: The report carries price facts, sentiment and a fallback analysis
    assert_eq!(outcome.classification.domain, Domain::Crypto);
    assert!(outcome.warnings.is_empty(), "warnings: {:?}", outcome.warnings);
    assert_eq!(outcome.providers, vec![ProviderId::Coingecko]);
    assert!(outcome.aggregate.sample_size > 0);

    let text = &outcome.response.text;
    assert!(text.starts_with("🪙 Crypto Report: BTC"));
    assert!(text.contains("• Price: $64,250.12"));
    assert!(text.contains("Sentiment\n• Score: "));
    assert!(text.contains("Analysis\n"));
    assert!(text.contains("Learn More: Visit coingecko.com/en/coins/bitcoin"));

    // Then: Snapshot and history were both requested
    let urls = http.urls();
    assert!(urls.iter().any(|url| url.contains("/coins/bitcoin?")));
    assert!(urls.iter().any(|url| url.contains("/coins/bitcoin/market_chart")));
}

#[tokio::test]
async fn when_user_checks_wallet_balance_system_queries_solana_rpc() {
    let http = Arc::new(ScriptedHttpClient::default());
    let dispatcher = dispatcher(http.clone());

    let outcome = dispatcher
        .respond(&Query::new(format!("what is the balance of wallet {WALLET}")))
        .await;

    assert_eq!(outcome.providers, vec![ProviderId::Solana]);
    assert!(outcome
        .response
        .text
        .starts_with(&format!("👛 Solana Wallet {WALLET}")));
    assert!(outcome
        .response
        .text
        .contains("• Balance: 1.500000000 SOL (1500000000 lamports)"));
    assert!(outcome
        .response
        .text
        .contains(&format!("Learn More: Visit https://explorer.solana.com/address/{WALLET}")));
}

// =============================================================================
// Stock Journeys
// =============================================================================

#[tokio::test]
async fn when_user_asks_about_apple_stock_system_reports_quote() {
    // Given: A transport that serves an Alpha Vantage quote
    let http = Arc::new(ScriptedHttpClient::default());
    let dispatcher = dispatcher(http.clone());

    // When: The user asks about AAPL
    let outcome = dispatcher.respond(&Query::new("how is AAPL stock doing")).await;

    // Then: Price facts come from the quote
    assert_eq!(outcome.classification.domain, Domain::Stock);
    assert_eq!(outcome.providers, vec![ProviderId::Alphavantage]);
    assert!(outcome.response.text.starts_with("📈 Stock Report: "));
    assert!(outcome.response.text.contains("• Price: $171.50"));
    assert!(http
        .urls()
        .iter()
        .any(|url| url.contains("symbol=AAPL")));
}

// =============================================================================
// Degraded Journeys
// =============================================================================

#[tokio::test]
async fn when_running_offline_system_answers_with_notice_instead_of_failing() {
    // Given: A dispatcher whose transport refuses every request
    let dispatcher = dispatcher(Arc::new(OfflineHttpClient));

    // When: A crypto query is answered
    let outcome = dispatcher.respond(&Query::new("bitcoin price today")).await;

    // Then: The response still renders, with a notice and a warning
    assert_eq!(outcome.classification.domain, Domain::Crypto);
    assert!(outcome.providers.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("crypto lookup failed"));
    let notice = outcome
        .facts
        .get(Facts::NOTICE)
        .map(|value| value.render())
        .expect("notice fact present");
    assert!(notice.starts_with("Data is currently unavailable ("));
    assert!(notice.contains("offline mode"));
    assert!(outcome.response.text.contains("• Notice: Data is currently unavailable"));
    assert!(outcome.response.text.contains("• Sources: No data"));
}

#[tokio::test]
async fn when_query_is_not_understood_system_sends_no_provider_requests() {
    let http = Arc::new(ScriptedHttpClient::default());
    let dispatcher = dispatcher(http.clone());

    let outcome = dispatcher.respond(&Query::new("hello there")).await;

    assert_eq!(outcome.classification.domain, Domain::Unknown);
    assert!(outcome
        .response
        .text
        .starts_with("❓ Sorry, I couldn't understand your query."));
    assert!(http.urls().is_empty());
}

// =============================================================================
// Chat Session Journeys
// =============================================================================

#[tokio::test]
async fn when_serious_symptom_is_followed_by_income_system_suggests_plans() {
    // Given: A chat session about chest pain
    let dispatcher = dispatcher(Arc::new(OfflineHttpClient));
    let symptom = ChatMessage::new(vec![MessageContent::text("I have chest pain")]);

    // When: The symptom message arrives
    let first = dispatcher
        .handle_message(&symptom)
        .await
        .expect("symptom gets a reply");

    // Then: The session stays open for the income question
    assert!(!first.ends_session());
    assert!(first
        .first_text()
        .is_some_and(|text| text.contains("please enter your monthly income")));

    // When: The user answers with an income
    let income = ChatMessage::new(vec![MessageContent::text("45,000")]);
    let second = dispatcher
        .handle_message(&income)
        .await
        .expect("income gets a reply");

    // Then: Plans are suggested and the session closes
    assert!(second.ends_session());
    assert!(second
        .first_text()
        .is_some_and(|text| text.contains("(standard tier)")));
}

#[tokio::test]
async fn when_session_end_arrives_system_stays_silent() {
    let dispatcher = dispatcher(Arc::new(OfflineHttpClient));
    let goodbye = ChatMessage::new(vec![MessageContent::EndSession]);

    assert_eq!(dispatcher.handle_message(&goodbye).await, None);
    assert_eq!(
        dispatcher.respond_to_income(10_000.0).follow_up,
        Some(FollowUp::InsurancePlans)
    );
}
