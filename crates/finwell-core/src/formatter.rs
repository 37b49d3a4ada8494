//! Renders a classification, an aggregate and a facts table into chat text.
//!
//! Output is a fixed sequence of sections: header, key facts, sentiment, analysis, domain
//! specific footer lines and a timestamp. Queries without an entity get a clarification
//! template instead.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::{InsuranceKind, PipelineConfig};
use crate::metrics::MarketMood;
use crate::numfmt::{format_count, format_currency, format_number, format_percent, format_price};
use crate::{AggregateResult, ClassificationResult, Domain, Entity, UtcDateTime};

pub const SERIOUS_WARNING: &str =
    "⚠️ This condition may be serious. Please seek medical attention promptly.";
pub const INSURANCE_PROMPT: &str =
    "Do you have health insurance? If not, please enter your monthly income.";
const MEDICAL_DISCLAIMER: &str =
    "This guidance is informational and not a substitute for professional medical advice.";

/// A single fact value and how it should be rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FactValue {
    /// Large dollar amounts with K/M/B suffixes.
    Currency(f64),
    /// Dollar price with thousands separators.
    Price(f64),
    Percent(f64),
    Count(f64),
    Number(f64),
    Text(String),
}

impl FactValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn render(&self) -> String {
        match self {
            Self::Currency(value) => format_currency(*value),
            Self::Price(value) => format_price(*value),
            Self::Percent(value) => format_percent(*value),
            Self::Count(value) => format_count(*value),
            Self::Number(value) => format_number(*value, 2),
            Self::Text(value) => value.clone(),
        }
    }
}

/// Insertion-ordered fact table. Re-inserting a name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    entries: Vec<(String, FactValue)>,
}

impl Facts {
    /// Rendered as its own block after the sentiment section.
    pub const ANALYSIS: &'static str = "Analysis";
    /// Rendered as the `Learn More` footer line.
    pub const WEBSITE: &'static str = "Website";
    pub const NOTICE: &'static str = "Notice";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FactValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: FactValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn text_values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(_, value)| match value {
            FactValue::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    fn bullet_entries(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.iter()
            .filter(|(name, _)| *name != Self::ANALYSIS && *name != Self::WEBSITE)
    }
}

impl Serialize for Facts {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, &value.render())?;
        }
        map.end()
    }
}

/// Action the caller should take with the user's next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    /// The user was asked for their monthly income.
    InsurancePrompt,
    /// The response lists insurance plans for a given income.
    InsurancePlans,
}

/// Final chat text plus an optional follow-up marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResponse {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUp>,
}

impl FormattedResponse {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            follow_up: None,
        }
    }
}

impl Display for FormattedResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct ResponseFormatter {
    config: Arc<PipelineConfig>,
}

impl ResponseFormatter {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn format(
        &self,
        classification: &ClassificationResult,
        aggregate: &AggregateResult,
        facts: &Facts,
    ) -> FormattedResponse {
        self.format_at(classification, aggregate, facts, UtcDateTime::now())
    }

    /// Same as [`ResponseFormatter::format`] with a fixed clock.
    pub fn format_at(
        &self,
        classification: &ClassificationResult,
        aggregate: &AggregateResult,
        facts: &Facts,
        generated_at: UtcDateTime,
    ) -> FormattedResponse {
        let domain = classification.domain;
        let serious = domain == Domain::Health && self.is_serious(classification, facts);

        let Some(entity) = &classification.entity else {
            let mut text = self.clarification(domain);
            if serious {
                text.push_str("\n\n");
                text.push_str(SERIOUS_WARNING);
                text.push('\n');
                text.push_str(INSURANCE_PROMPT);
            }
            return FormattedResponse {
                text,
                follow_up: serious.then_some(FollowUp::InsurancePrompt),
            };
        };

        let mut sections = vec![header(domain, entity)];

        let bullets = facts
            .bullet_entries()
            .map(|(name, value)| format!("• {name}: {}", value.render()))
            .collect::<Vec<_>>();
        if !bullets.is_empty() {
            sections.push(format!("Key Facts\n{}", bullets.join("\n")));
        }

        if domain != Domain::Health {
            sections.push(sentiment_section(domain, aggregate));
        }

        if let Some(analysis) = facts.get(Facts::ANALYSIS) {
            sections.push(format!("Analysis\n{}", analysis.render()));
        }

        if domain == Domain::Health {
            let mut lines = Vec::new();
            if serious {
                lines.push(String::from(SERIOUS_WARNING));
                lines.push(String::from(INSURANCE_PROMPT));
            }
            lines.push(String::from(MEDICAL_DISCLAIMER));
            sections.push(lines.join("\n"));
        }

        if let Some(website) = facts.get(Facts::WEBSITE) {
            sections.push(format!("Learn More: Visit {}", website.render()));
        }

        sections.push(format!("🕒 Generated on {}", generated_at.format_long()));

        FormattedResponse {
            text: sections.join("\n\n"),
            follow_up: serious.then_some(FollowUp::InsurancePrompt),
        }
    }

    /// First serious keyword found in the query text or any text fact.
    pub fn serious_keyword<'a>(
        &'a self,
        classification: &ClassificationResult,
        facts: &Facts,
    ) -> Option<&'a str> {
        let haystacks = std::iter::once(classification.text.to_lowercase())
            .chain(facts.text_values().map(str::to_lowercase))
            .collect::<Vec<_>>();

        self.config
            .serious_keywords
            .iter()
            .find(|keyword| {
                let keyword = keyword.to_lowercase();
                haystacks.iter().any(|text| text.contains(keyword.as_str()))
            })
            .map(String::as_str)
    }

    fn is_serious(&self, classification: &ClassificationResult, facts: &Facts) -> bool {
        self.serious_keyword(classification, facts).is_some()
    }

    /// Template shown when a domain matched but no entity could be extracted.
    pub fn clarification(&self, domain: Domain) -> String {
        match domain {
            Domain::Crypto => String::from(
                "I couldn't identify a cryptocurrency in your message. Please specify a \
cryptocurrency like BTC, ETH, or LINK.\nYou can also paste a Solana wallet address to check its \
balance, recent transactions or token holdings.",
            ),
            Domain::Stock => format!(
                "I couldn't identify a stock in your message. Please specify a company or ticker, \
for example: {}.",
                self.config
                    .tickers
                    .iter()
                    .take(6)
                    .map(|entry| format!("{} ({})", entry.name, entry.ticker))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Domain::Insurance => {
                let list = |kind: InsuranceKind| {
                    self.config
                        .insurers_of_kind(kind)
                        .map(|insurer| insurer.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(
                    "I couldn't identify an insurance company in your query. Try asking about \
one of these companies:\n\nHealth Insurance: {}\n\nLife Insurance: {}\n\nExample: \"What's \
the outlook for Aetna health insurance?\"",
                    list(InsuranceKind::Health),
                    list(InsuranceKind::Life)
                )
            }
            Domain::Health => String::from(
                "Please describe your symptoms or your medication question, for example: \
\"I have had a headache and fever since yesterday\" or \"Remind me how to take my blood \
pressure tablets\".",
            ),
            Domain::Unknown => String::from(
                "❓ Sorry, I couldn't understand your query.\nTry one of these:\n\
• \"How is AAPL stock doing?\"\n\
• \"What's the sentiment on bitcoin?\"\n\
• \"I have a sore throat and a fever\"\n\
• \"Tell me about Cigna insurance\"",
            ),
        }
    }

    /// Plan suggestions for a monthly income, answering an [`FollowUp::InsurancePrompt`].
    pub fn insurance_plans(&self, monthly_income: f64) -> FormattedResponse {
        let Some(tier) = self.config.plan_tier(monthly_income) else {
            return FormattedResponse {
                text: String::from("Please enter your monthly income as a positive number."),
                follow_up: Some(FollowUp::InsurancePrompt),
            };
        };

        let plans = tier
            .plans
            .iter()
            .enumerate()
            .map(|(index, plan)| format!("{}. {plan}", index + 1))
            .collect::<Vec<_>>()
            .join("\n");

        FormattedResponse {
            text: format!(
                "🏥 Suggested health insurance plans for a monthly income of {} ({} tier):\n{plans}",
                format_count(monthly_income),
                tier.label
            ),
            follow_up: Some(FollowUp::InsurancePlans),
        }
    }
}

fn header(domain: Domain, entity: &Entity) -> String {
    let name = entity.display_name();
    match domain {
        Domain::Stock => format!("📈 Stock Report: {name}"),
        Domain::Crypto => match entity {
            Entity::WalletAddress { .. } => format!("👛 Solana {name}"),
            _ => format!("🪙 Crypto Report: {name}"),
        },
        Domain::Insurance => format!("🛡️ Insurance Report: {name}"),
        Domain::Health => format!("🩺 Health Guidance: {name}"),
        Domain::Unknown => format!("ℹ️ {name}"),
    }
}

fn sentiment_section(domain: Domain, aggregate: &AggregateResult) -> String {
    let mut lines = vec![
        String::from("Sentiment"),
        format!(
            "• Score: {} ({})",
            format_number(aggregate.score, 2),
            aggregate.category.label()
        ),
        format!("• Samples: {}", aggregate.sample_size),
        format!("• Sources: {}", aggregate.sources.join(", ")),
    ];

    if !aggregate.is_empty() {
        let mood = match domain {
            Domain::Insurance => {
                if aggregate.score > 0.1 {
                    String::from("👍 Favorable")
                } else if aggregate.score < -0.1 {
                    String::from("👎 Unfavorable")
                } else {
                    String::from("➖ Mixed")
                }
            }
            _ => {
                let mood = MarketMood::from_score(aggregate.score);
                format!("{} {}", mood.emoji(), mood.label())
            }
        };
        lines.push(format!("• Mood: {mood}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{HealthTopic, SentimentCategory, Symbol};

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::new(Arc::new(PipelineConfig::default()))
    }

    fn at() -> UtcDateTime {
        UtcDateTime::parse("2024-03-05T14:03:09Z").expect("valid")
    }

    fn classification(domain: Domain, entity: Option<Entity>, text: &str) -> ClassificationResult {
        ClassificationResult {
            domain,
            entity,
            matched_keywords: BTreeSet::new(),
            text: text.to_owned(),
        }
    }

    #[test]
    fn facts_keep_insertion_order_and_replace_in_place() {
        let mut facts = Facts::new()
            .with("Price", FactValue::Price(1.0))
            .with("Volume", FactValue::Count(2.0));
        facts.insert("Price", FactValue::Price(3.0));

        let names = facts.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, vec!["Price", "Volume"]);
        assert_eq!(facts.get("Price"), Some(&FactValue::Price(3.0)));
    }

    #[test]
    fn facts_serialize_rendered_values_in_order() {
        let facts = Facts::new()
            .with("Market Cap", FactValue::Currency(1_500_000_000.0))
            .with("24h Change", FactValue::Percent(-3.333));
        let json = serde_json::to_string(&facts).expect("serializes");
        assert_eq!(json, r#"{"Market Cap":"$1.50B","24h Change":"-3.33%"}"#);
    }

    #[test]
    fn stock_report_has_all_sections_in_order() {
        let symbol = Symbol::parse("AAPL").expect("valid");
        let aggregate = AggregateResult {
            score: 0.2,
            category: SentimentCategory::VeryPositive,
            sample_size: 2,
            sources: vec![String::from("quote")],
        };
        let facts = Facts::new()
            .with("Price", FactValue::Price(189.5))
            .with(Facts::ANALYSIS, FactValue::text("Looks steady."));

        let response = formatter().format_at(
            &classification(Domain::Stock, Some(Entity::Ticker { symbol }), "aapl stock"),
            &aggregate,
            &facts,
            at(),
        );

        let expected = "📈 Stock Report: AAPL\n\n\
Key Facts\n• Price: $189.50\n\n\
Sentiment\n• Score: 0.20 (very positive)\n• Samples: 2\n• Sources: quote\n• Mood: 📈 Bullish\n\n\
Analysis\nLooks steady.\n\n\
🕒 Generated on March 05, 2024 at 14:03:09 UTC";
        assert_eq!(response.text, expected);
        assert_eq!(response.follow_up, None);
    }

    #[test]
    fn empty_aggregate_reports_no_data() {
        let entity = Entity::Token {
            symbol: String::from("btc"),
        };
        let response = formatter().format_at(
            &classification(Domain::Crypto, Some(entity), "btc"),
            &AggregateResult::empty(),
            &Facts::new(),
            at(),
        );

        assert!(response.text.contains("• Sources: No data"));
        assert!(!response.text.contains("Mood"));
        assert!(!response.text.contains("Key Facts"));
    }

    #[test]
    fn missing_entity_renders_clarification_only() {
        let response = formatter().format_at(
            &classification(Domain::Crypto, None, "crypto news"),
            &AggregateResult::empty(),
            &Facts::new().with("Price", FactValue::Price(1.0)),
            at(),
        );

        assert!(response.text.starts_with("I couldn't identify a cryptocurrency"));
        assert!(!response.text.contains("Price"));
        assert!(!response.text.contains("Generated on"));
    }

    #[test]
    fn serious_health_query_asks_about_insurance() {
        let entity = Entity::HealthTopic {
            topic: HealthTopic::Symptom,
        };
        let response = formatter().format_at(
            &classification(Domain::Health, Some(entity), "i have chest pain"),
            &AggregateResult::empty(),
            &Facts::new(),
            at(),
        );

        assert!(response.text.contains(SERIOUS_WARNING));
        assert!(response.text.contains(INSURANCE_PROMPT));
        assert_eq!(response.follow_up, Some(FollowUp::InsurancePrompt));
        assert!(!response.text.contains("Sentiment"));
    }

    #[test]
    fn serious_phrase_in_text_fact_also_triggers_prompt() {
        let entity = Entity::HealthTopic {
            topic: HealthTopic::Symptom,
        };
        let facts = Facts::new().with(
            Facts::ANALYSIS,
            FactValue::text("This condition may be serious if it persists."),
        );
        let response = formatter().format_at(
            &classification(Domain::Health, Some(entity), "my knee hurts"),
            &AggregateResult::empty(),
            &facts,
            at(),
        );
        assert_eq!(response.follow_up, Some(FollowUp::InsurancePrompt));
    }

    #[test]
    fn serious_keywords_only_apply_to_health() {
        let entity = Entity::Token {
            symbol: String::from("sol"),
        };
        let response = formatter().format_at(
            &classification(Domain::Crypto, Some(entity), "is solana in critical condition"),
            &AggregateResult::empty(),
            &Facts::new(),
            at(),
        );
        assert_eq!(response.follow_up, None);
    }

    #[test]
    fn insurance_plans_follow_income_brackets() {
        let response = formatter().insurance_plans(45_000.0);
        assert!(response.text.contains("45,000 (standard tier)"));
        assert!(response.text.contains("1. Niva Bupa ReAssure"));
        assert_eq!(response.follow_up, Some(FollowUp::InsurancePlans));

        let invalid = formatter().insurance_plans(-5.0);
        assert_eq!(invalid.follow_up, Some(FollowUp::InsurancePrompt));
    }

    #[test]
    fn insurance_clarification_lists_companies_by_kind() {
        let text = formatter().clarification(Domain::Insurance);
        assert!(text.contains("Health Insurance: Aetna, Anthem, Cigna"));
        assert!(text.contains("Life Insurance: MetLife, Prudential"));
        assert!(!text.contains("Aflac"));
    }
}
