//! Query dispatch: extractor, handler table, aggregator and formatter wired together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::MetricAggregator;
use crate::config::{PipelineConfig, ProviderSettings};
use crate::envelope::EnvelopeError;
use crate::extractor::IntentExtractor;
use crate::formatter::{FactValue, Facts, FollowUp, FormattedResponse, ResponseFormatter};
use crate::handlers::{
    CryptoHandler, DomainHandler, HandlerOutput, HealthHandler, InsuranceHandler, SampleScorer,
    StockHandler,
};
use crate::http_client::HttpClient;
use crate::message::ChatMessage;
use crate::providers::{
    AlphaVantageClient, CoinGeckoClient, LlmClient, NewsClient, ProviderId, SolanaRpcClient,
};
use crate::sentiment::LexiconScorer;
use crate::{AggregateResult, ClassificationResult, Domain, Query};

/// Everything produced while answering one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub classification: ClassificationResult,
    pub aggregate: AggregateResult,
    pub facts: Facts,
    pub response: FormattedResponse,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderId>,
    /// Set when the handler's primary lookup failed and the response fell back to a notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<EnvelopeError>,
    pub latency_ms: u64,
}

/// Routes each classified query to the handler registered for its domain.
pub struct Dispatcher {
    extractor: Arc<IntentExtractor>,
    aggregator: MetricAggregator,
    scorer: Arc<LexiconScorer>,
    formatter: ResponseFormatter,
    handlers: HashMap<Domain, Arc<dyn DomainHandler>>,
}

impl Dispatcher {
    /// Dispatcher with an empty handler table; matched queries then get a warning and no facts.
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self {
            extractor: Arc::new(IntentExtractor::new(Arc::clone(&config))),
            aggregator: MetricAggregator::new(config.max_sources),
            scorer: Arc::new(LexiconScorer::new()),
            formatter: ResponseFormatter::new(config),
            handlers: HashMap::new(),
        }
    }

    /// Wires the four built-in handlers over one shared transport.
    pub fn with_default_handlers(
        config: Arc<PipelineConfig>,
        settings: &ProviderSettings,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let dispatcher = Self::new(Arc::clone(&config));
        let scorer = SampleScorer::new(dispatcher.aggregator, Arc::clone(&dispatcher.scorer));
        let llm = LlmClient::from_settings(Arc::clone(&http), settings).map(Arc::new);
        debug!(settings = ?settings, llm = llm.is_some(), "building default handlers");

        let mut crypto = CryptoHandler::new(
            Arc::clone(&config),
            CoinGeckoClient::from_settings(Arc::clone(&http), settings),
            SolanaRpcClient::from_settings(Arc::clone(&http), settings),
        )
        .with_scorer(scorer.clone());
        if let Some(template) = &settings.news_url {
            crypto = crypto.with_news(NewsClient::new(
                Arc::clone(&http),
                template.as_str(),
                settings.timeout_ms,
            ));
        }

        let mut stock = StockHandler::new(
            Arc::clone(&config),
            AlphaVantageClient::from_settings(Arc::clone(&http), settings),
        )
        .with_scorer(scorer.clone());

        let mut insurance = InsuranceHandler::new(
            Arc::clone(&config),
            AlphaVantageClient::from_settings(Arc::clone(&http), settings),
        )
        .with_extractor(Arc::clone(&dispatcher.extractor))
        .with_scorer(scorer);

        let mut health = HealthHandler::new();

        if let Some(llm) = llm {
            crypto = crypto.with_llm(Arc::clone(&llm));
            stock = stock.with_llm(Arc::clone(&llm));
            insurance = insurance.with_llm(Arc::clone(&llm));
            health = health.with_llm(llm);
        }

        dispatcher
            .with_handler(Arc::new(crypto))
            .with_handler(Arc::new(stock))
            .with_handler(Arc::new(insurance))
            .with_handler(Arc::new(health))
    }

    /// Registers `handler` for its domain, replacing any previous one.
    pub fn with_handler(mut self, handler: Arc<dyn DomainHandler>) -> Self {
        self.handlers.insert(handler.domain(), handler);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<LexiconScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn extractor(&self) -> &IntentExtractor {
        &self.extractor
    }

    pub fn formatter(&self) -> &ResponseFormatter {
        &self.formatter
    }

    pub fn has_handler(&self, domain: Domain) -> bool {
        self.handlers.contains_key(&domain)
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        self.extractor.classify(text)
    }

    pub async fn respond(&self, query: &Query) -> DispatchOutcome {
        let started = Instant::now();
        let classification = self.classify(&query.text);
        let (output, failure) = self.collect(&classification).await;

        let aggregate = self
            .aggregator
            .aggregate(&output.samples, |text| self.scorer.score(text));
        let response = self.formatter.format(&classification, &aggregate, &output.facts);
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            domain = %classification.domain,
            entity = classification.entity.as_ref().map(|entity| entity.as_str()),
            sender = query.sender.as_deref(),
            samples = aggregate.sample_size,
            warnings = output.warnings.len(),
            latency_ms,
            "dispatched query"
        );

        DispatchOutcome {
            classification,
            aggregate,
            facts: output.facts,
            response,
            warnings: output.warnings,
            providers: output.providers,
            failure,
            latency_ms,
        }
    }

    async fn collect(
        &self,
        classification: &ClassificationResult,
    ) -> (HandlerOutput, Option<EnvelopeError>) {
        if classification.entity.is_none() {
            return (HandlerOutput::new(), None);
        }

        let Some(handler) = self.handlers.get(&classification.domain) else {
            let mut output = HandlerOutput::new();
            warn!(domain = %classification.domain, "no handler registered");
            output
                .warnings
                .push(format!("no handler registered for domain {}", classification.domain));
            return (output, None);
        };

        match handler.handle(classification).await {
            Ok(output) => (output, None),
            Err(error) => {
                let mut output = HandlerOutput::new();
                output.push_warning(&format!("{} lookup failed", classification.domain), &error);
                output.fact(
                    Facts::NOTICE,
                    FactValue::text(format!("Data is currently unavailable ({})", error.message())),
                );
                let failure = match EnvelopeError::new(error.code(), error.message()) {
                    Ok(failure) => Some(failure.with_retryable(error.retryable())),
                    Err(rejected) => {
                        warn!(
                            domain = %classification.domain,
                            code = error.code(),
                            error = %rejected,
                            "handler failure not representable as envelope error"
                        );
                        None
                    }
                };
                (output, failure)
            }
        }
    }

    /// Answers the income reply that follows an insurance prompt.
    pub fn respond_to_income(&self, monthly_income: f64) -> FormattedResponse {
        self.formatter.insurance_plans(monthly_income)
    }

    /// Transport-level entry point. Returns `None` when the message needs no reply.
    ///
    /// A reply closes the session unless it asks the user for their income.
    pub async fn handle_message(&self, message: &ChatMessage) -> Option<ChatMessage> {
        if message.ends_session() {
            debug!(msg_id = %message.msg_id, "session ended by sender");
            return None;
        }
        let text = message.first_text()?.trim();
        if text.is_empty() {
            return None;
        }

        let response = match parse_income(text) {
            Some(income) => self.respond_to_income(income),
            None => self.respond(&Query::new(text)).await.response,
        };
        let end_session = response.follow_up != Some(FollowUp::InsurancePrompt);
        Some(ChatMessage::reply(response.text, end_session))
    }
}

/// Accepts digit-only replies such as `45000`, `45,000` or `$45000.50`.
pub fn parse_income(text: &str) -> Option<f64> {
    let cleaned = text.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty()
        || !cleaned.chars().any(|c| c.is_ascii_digit())
        || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}
