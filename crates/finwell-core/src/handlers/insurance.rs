use std::sync::Arc;

use tracing::debug;

use super::stock::{quote_facts, quote_texts};
use super::{narrate, DomainHandler, HandlerFuture, HandlerOutput, SampleScorer};
use crate::config::{InsuranceKind, InsurerEntry, PipelineConfig};
use crate::extractor::{InsuranceFocus, IntentExtractor};
use crate::formatter::{FactValue, Facts};
use crate::numfmt::{format_count, format_percent, format_price};
use crate::providers::{AlphaVantageClient, EquityQuote, LlmClient, ProviderId};
use crate::{AggregateResult, ClassificationResult, Domain, Entity, SentimentCategory, Symbol};

const SYSTEM_PROMPT: &str = "You are an insurance market analyst writing for consumers. Keep the \
response informative and consumer-focused (maximum 250 words).";
const SAMPLE_LABEL: &str = "Alpha Vantage";

/// Insurer overviews, with stock performance for publicly traded companies.
pub struct InsuranceHandler {
    config: Arc<PipelineConfig>,
    extractor: Arc<IntentExtractor>,
    quotes: AlphaVantageClient,
    llm: Option<Arc<LlmClient>>,
    scorer: SampleScorer,
}

impl InsuranceHandler {
    pub fn new(config: Arc<PipelineConfig>, quotes: AlphaVantageClient) -> Self {
        Self {
            extractor: Arc::new(IntentExtractor::new(Arc::clone(&config))),
            config,
            quotes,
            llm: None,
            scorer: SampleScorer::default(),
        }
    }

    /// Shares an already compiled extractor instead of building a second one.
    pub fn with_extractor(mut self, extractor: Arc<IntentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_llm(mut self, llm: Arc<LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_scorer(mut self, scorer: SampleScorer) -> Self {
        self.scorer = scorer;
        self
    }

    async fn report(&self, key: &str, name: &str, text: &str) -> HandlerOutput {
        let mut output = HandlerOutput::new();
        let Some(insurer) = self.config.insurer(key) else {
            output.fact("Company", FactValue::text(name));
            return output;
        };

        let focus = self.extractor.insurance_focus(text);
        output.fact("Company", FactValue::text(insurer.name.as_str()));
        output.fact("Type", FactValue::text(insurer.kind.label()));
        if !focus.terms.is_empty() {
            output.fact("Areas of Focus", FactValue::text(focus.terms.join(", ")));
        }
        let asked = focus
            .kinds
            .iter()
            .filter(|kind| **kind != insurer.kind)
            .map(|kind| kind.label())
            .collect::<Vec<_>>();
        if !asked.is_empty() {
            output.fact("Coverage Asked About", FactValue::text(asked.join(", ")));
        }

        let quote = self.quote(insurer, &mut output).await;
        if let Some(quote) = &quote {
            output.fact("Ticker", FactValue::text(quote.symbol.as_str()));
            quote_facts(quote, &mut output);
            output.push_samples(quote_texts(&insurer.name, quote), SAMPLE_LABEL);
        }

        let aggregate = self.scorer.aggregate(&output.samples);
        let prompt = insurance_prompt(insurer, quote.as_ref(), &aggregate, &focus);
        let analysis = narrate(
            self.llm.as_deref(),
            SYSTEM_PROMPT,
            &prompt,
            &mut output,
            || insurance_fallback_analysis(insurer, quote.as_ref(), &aggregate),
        )
        .await;
        output.fact(Facts::ANALYSIS, FactValue::Text(analysis));
        output.fact(Facts::WEBSITE, FactValue::text(insurer.website.as_str()));
        output
    }

    /// Stock data is optional for insurers; failures become warnings.
    async fn quote(&self, insurer: &InsurerEntry, output: &mut HandlerOutput) -> Option<EquityQuote> {
        let ticker = insurer.ticker.as_deref()?;
        let symbol = match Symbol::parse(ticker) {
            Ok(symbol) => symbol,
            Err(error) => {
                debug!(insurer = %insurer.key, %error, "skipping invalid insurer ticker");
                return None;
            }
        };

        match self.quotes.global_quote(&symbol).await {
            Ok(quote) => {
                output.used(ProviderId::Alphavantage);
                Some(quote)
            }
            Err(error) => {
                output.push_warning(&format!("stock quote for {symbol}"), &error);
                None
            }
        }
    }
}

impl DomainHandler for InsuranceHandler {
    fn domain(&self) -> Domain {
        Domain::Insurance
    }

    fn handle<'a>(&'a self, classification: &'a ClassificationResult) -> HandlerFuture<'a> {
        Box::pin(async move {
            match &classification.entity {
                Some(Entity::Provider { key, name }) => {
                    Ok(self.report(key, name, &classification.text).await)
                }
                _ => Ok(HandlerOutput::new()),
            }
        })
    }
}

fn insurance_prompt(
    insurer: &InsurerEntry,
    quote: Option<&EquityQuote>,
    aggregate: &AggregateResult,
    focus: &InsuranceFocus,
) -> String {
    let market = quote
        .map(|quote| {
            format!(
                "\nStock Performance:\n- Stock Price: {}\n- Daily Change: {} ({})\n- Trading Volume: \
{}\n- Day Range: {} - {}\n",
                format_price(quote.price),
                format_price(quote.change),
                format_percent(quote.change_percent),
                format_count(quote.volume),
                format_price(quote.low),
                format_price(quote.high),
            )
        })
        .unwrap_or_default();
    let interests = if focus.terms.is_empty() {
        String::from("General inquiry")
    } else {
        focus.terms.join(", ")
    };

    format!(
        "Provide an analysis for insurance inquiry - analyzing {name} ({kind} insurance):\n{market}\n\
Sentiment Analysis:\n- Category: {category}\n- Score: {score:.2}\n- Based on {samples} sources\n\n\
Specific areas of interest: {interests}\n\n\
Please provide a structured analysis with:\n\
1. Overview of the insurance company/type and current market position\n\
2. Key factors affecting premiums and coverage in this segment\n\
3. Current market trends and consumer sentiment\n\
4. Recommendations for consumers considering this insurance option",
        name = insurer.name,
        kind = insurer.kind,
        category = aggregate.category.label(),
        score = aggregate.score,
        samples = aggregate.sample_size,
    )
}

/// Deterministic insurer narrative used when no LLM analysis is available.
pub fn insurance_fallback_analysis(
    insurer: &InsurerEntry,
    quote: Option<&EquityQuote>,
    aggregate: &AggregateResult,
) -> String {
    let mut overview = format!(
        "{} is a major player in the {} insurance market.",
        insurer.name, insurer.kind
    );
    if let Some(quote) = quote {
        let change = quote.change_percent;
        overview.push(' ');
        if change > 2.0 {
            overview.push_str(&format!(
                "The company's stock performance shows strength with a {} gain, potentially \
indicating investor confidence in their business model.",
                format_percent(change)
            ));
        } else if change < -2.0 {
            overview.push_str(&format!(
                "Recent stock performance shows a {} decline, which may reflect market challenges \
or broader economic concerns.",
                format_percent(change.abs())
            ));
        } else {
            overview.push_str("Stock performance remains stable, suggesting steady business operations.");
        }
    }

    let outlook = match aggregate.category {
        SentimentCategory::Positive | SentimentCategory::VeryPositive => {
            "suggests consumer confidence in their products and services. This could translate to \
competitive pricing and expanded coverage options."
        }
        SentimentCategory::Negative | SentimentCategory::VeryNegative => {
            "indicates some consumer concerns. Potential customers should carefully review policy \
terms and consider alternatives."
        }
        SentimentCategory::Neutral => {
            "shows mixed consumer opinions. This presents an opportunity to evaluate their \
offerings against competitors."
        }
    };

    format!(
        "Company Overview:\n{overview}\n\nMarket Sentiment:\nCurrent market sentiment is {}, which \
{outlook}\n\nConsumer Recommendations:\n{}",
        aggregate.category.label(),
        recommendations(insurer.kind),
    )
}

fn recommendations(kind: InsuranceKind) -> &'static str {
    match kind {
        InsuranceKind::Health => {
            "- Compare network coverage in your area\n- Review prescription drug formularies\n\
- Check annual out-of-pocket maximums\n- Consider HSA compatibility if relevant"
        }
        InsuranceKind::Life => {
            "- Determine appropriate coverage amount (typically 10-12x annual income)\n\
- Compare term vs. permanent life insurance options\n- Review financial strength ratings\n\
- Understand policy riders and benefits"
        }
        _ => {
            "- Compare coverage options and exclusions\n- Review customer service ratings\n\
- Check claim processing times\n- Understand premium adjustment policies"
        }
    }
}
