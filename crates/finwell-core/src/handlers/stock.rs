use std::sync::Arc;

use super::{narrate, DomainHandler, HandlerFuture, HandlerOutput, SampleScorer};
use crate::config::PipelineConfig;
use crate::formatter::{FactValue, Facts};
use crate::metrics::PriceTrend;
use crate::numfmt::{format_count, format_percent, format_price};
use crate::providers::{AlphaVantageClient, EquityQuote, LlmClient, ProviderId, SourceError};
use crate::{AggregateResult, ClassificationResult, Domain, Entity};

const SYSTEM_PROMPT: &str = "You are a professional equity research analyst. Keep the response \
concise (maximum 200 words), neutral and strictly based on the provided data. Do not output code.";
const SAMPLE_LABEL: &str = "Alpha Vantage";

/// Equity reports from Alpha Vantage quotes.
pub struct StockHandler {
    config: Arc<PipelineConfig>,
    quotes: AlphaVantageClient,
    llm: Option<Arc<LlmClient>>,
    scorer: SampleScorer,
}

impl StockHandler {
    pub fn new(config: Arc<PipelineConfig>, quotes: AlphaVantageClient) -> Self {
        Self {
            config,
            quotes,
            llm: None,
            scorer: SampleScorer::default(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_scorer(mut self, scorer: SampleScorer) -> Self {
        self.scorer = scorer;
        self
    }

    async fn report(&self, symbol: &crate::Symbol) -> Result<HandlerOutput, SourceError> {
        let company = self.config.company_name(symbol);
        let mut output = HandlerOutput::new();

        let quote = self.quotes.global_quote(symbol).await?;
        output.used(ProviderId::Alphavantage);

        output.fact("Company", FactValue::text(company.as_str()));
        quote_facts(&quote, &mut output);
        output.push_samples(quote_texts(&company, &quote), SAMPLE_LABEL);

        let aggregate = self.scorer.aggregate(&output.samples);
        let prompt = stock_prompt(&company, &quote, &aggregate);
        let analysis = narrate(
            self.llm.as_deref(),
            SYSTEM_PROMPT,
            &prompt,
            &mut output,
            || stock_fallback_analysis(&company, &quote, &aggregate),
        )
        .await;
        output.fact(Facts::ANALYSIS, FactValue::Text(analysis));
        Ok(output)
    }
}

impl DomainHandler for StockHandler {
    fn domain(&self) -> Domain {
        Domain::Stock
    }

    fn handle<'a>(&'a self, classification: &'a ClassificationResult) -> HandlerFuture<'a> {
        Box::pin(async move {
            match &classification.entity {
                Some(Entity::Ticker { symbol }) => self.report(symbol).await,
                _ => Ok(HandlerOutput::new()),
            }
        })
    }
}

/// Quote facts shared by stock and insurer reports.
pub(crate) fn quote_facts(quote: &EquityQuote, output: &mut HandlerOutput) {
    output.fact("Price", FactValue::Price(quote.price));
    output.fact("Change", FactValue::Price(quote.change));
    output.fact("Change %", FactValue::Percent(quote.change_percent));
    output.fact("Volume", FactValue::Count(quote.volume));
    output.fact(
        "Day Range",
        FactValue::text(format!(
            "{} - {}",
            format_price(quote.low),
            format_price(quote.high)
        )),
    );
    output.fact(
        "Trend",
        FactValue::text(PriceTrend::daily(quote.change_percent).to_string()),
    );
    if let Some(day) = &quote.latest_trading_day {
        output.fact("Trading Day", FactValue::text(day.as_str()));
    }
}

/// Sentences describing a daily quote, used as sentiment samples.
pub(crate) fn quote_texts(name: &str, quote: &EquityQuote) -> Vec<String> {
    let change = format_percent(quote.change_percent);
    let mut texts = vec![match PriceTrend::daily(quote.change_percent) {
        PriceTrend::StrongUp => format!(
            "{name} shares surged {change} today, showing strong investor momentum."
        ),
        PriceTrend::Up => format!("{name} shares rose {change} today."),
        PriceTrend::Stable => format!("{name} shares were stable with a {change} move today."),
        PriceTrend::Down => format!("{name} shares fell {change} today."),
        PriceTrend::StrongDown => format!(
            "{name} shares dropped sharply by {change} today, raising investor concern."
        ),
    }];

    if quote.low > 0.0 {
        let range_pct = (quote.high - quote.low) / quote.low * 100.0;
        if range_pct > 4.0 {
            texts.push(format!(
                "{name} traded in a wide {range_pct:.2}% intraday range, a sign of volatility."
            ));
        }
    }
    texts
}

fn stock_prompt(company: &str, quote: &EquityQuote, aggregate: &AggregateResult) -> String {
    format!(
        "Analyze the latest trading data for {company} ({symbol}).\n\n\
Quote:\n\
- Price: {price}\n\
- Daily change: {change} ({change_pct})\n\
- Volume: {volume}\n\
- Day range: {low} - {high}\n\n\
Sentiment:\n\
- Category: {category}\n\
- Score: {score:.2}\n\
- Based on {samples} samples\n\n\
Provide a short memo with an elevator pitch, what stands out, risks to watch and a \
buy/hold/sell view with a clear rationale.",
        symbol = quote.symbol,
        price = format_price(quote.price),
        change = format_price(quote.change),
        change_pct = format_percent(quote.change_percent),
        volume = format_count(quote.volume),
        low = format_price(quote.low),
        high = format_price(quote.high),
        category = aggregate.category.label(),
        score = aggregate.score,
        samples = aggregate.sample_size,
    )
}

/// Deterministic stock narrative used when no LLM analysis is available.
pub fn stock_fallback_analysis(
    company: &str,
    quote: &EquityQuote,
    aggregate: &AggregateResult,
) -> String {
    let trend = PriceTrend::daily(quote.change_percent);
    let momentum = match trend {
        PriceTrend::StrongUp | PriceTrend::Up => {
            "Buyers are in control for the session; confirm the move with volume before acting."
        }
        PriceTrend::Stable => "The session was quiet, with no clear directional signal.",
        PriceTrend::Down | PriceTrend::StrongDown => {
            "Sellers dominated the session; watch whether the day's low holds as support."
        }
    };

    format!(
        "Quick Take:\n{company} ({symbol}) last traded at {price}, {change_pct} on the day ({trend} trend) \
on volume of {volume}. {momentum}\n\nSentiment:\nQuote-derived sentiment is {category} \
(score {score:.2}).\n\nKey Points to Watch:\n- Follow-through in the next sessions\n\
- Company news and earnings dates\n- Broader market direction",
        symbol = quote.symbol,
        price = format_price(quote.price),
        trend = trend.label(),
        change_pct = format_percent(quote.change_percent),
        volume = format_count(quote.volume),
        category = aggregate.category.label(),
        score = aggregate.score,
    )
}
