use std::sync::Arc;

use super::{narrate, DomainHandler, HandlerFuture, HandlerOutput};
use crate::formatter::{FactValue, Facts};
use crate::providers::LlmClient;
use crate::{ClassificationResult, Domain, Entity, HealthTopic};

const SYSTEM_PROMPT: &str = "You are a careful health assistant. Give general, safe guidance in \
plain language, never a diagnosis. If the described condition could be dangerous, say clearly that \
this condition may be serious and that the user should seek medical care.";

/// Symptom and medication guidance. Needs no market data; the narrative is the whole report.
pub struct HealthHandler {
    llm: Option<Arc<LlmClient>>,
}

impl HealthHandler {
    pub fn new() -> Self {
        Self { llm: None }
    }

    pub fn with_llm(mut self, llm: Arc<LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }
}

impl Default for HealthHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainHandler for HealthHandler {
    fn domain(&self) -> Domain {
        Domain::Health
    }

    fn handle<'a>(&'a self, classification: &'a ClassificationResult) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut output = HandlerOutput::new();
            let Some(Entity::HealthTopic { topic }) = &classification.entity else {
                return Ok(output);
            };
            let topic = *topic;
            let text = classification.text.as_str();

            output.fact("Topic", FactValue::text(topic.as_str()));
            let guidance = narrate(
                self.llm.as_deref(),
                SYSTEM_PROMPT,
                &health_prompt(topic, text),
                &mut output,
                || health_fallback_guidance(topic, text),
            )
            .await;
            output.fact(Facts::ANALYSIS, FactValue::Text(guidance));
            Ok(output)
        })
    }
}

fn health_prompt(topic: HealthTopic, query: &str) -> String {
    match topic {
        HealthTopic::Symptom => format!(
            "Based on the following symptoms: {query}, suggest possible causes and recommend next \
steps or actions the user should take, such as home remedies, consulting a doctor, or emergency care."
        ),
        HealthTopic::Medication => format!(
            "Respond to the following user request about medication: {query}. Provide reminders, \
dosage info, or any safety suggestions as needed."
        ),
    }
}

/// Generic guidance used when no LLM answer is available. It never names a condition.
pub fn health_fallback_guidance(topic: HealthTopic, query: &str) -> String {
    match topic {
        HealthTopic::Symptom => format!(
            "You described: \"{query}\".\n\nGeneral Guidance:\n\
- Rest, stay hydrated and keep track of when the symptoms started and how they change\n\
- Over-the-counter remedies may help with mild discomfort; follow the label directions\n\
- Book an appointment with a doctor if the symptoms last more than a few days or get worse\n\
- Get immediate medical help for severe pain, trouble breathing or fainting"
        ),
        HealthTopic::Medication => format!(
            "You asked: \"{query}\".\n\nMedication Tips:\n\
- Take each dose at the same time every day; a phone alarm or pill organizer helps\n\
- Do not double up on a missed dose unless your pharmacist tells you to\n\
- Check with a pharmacist before combining prescriptions, supplements or alcohol\n\
- Keep an up-to-date list of your medications and dosages for your doctor"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::providers::testing::RecordingHttpClient;
    use crate::providers::ProviderId;

    fn classification(topic: HealthTopic, text: &str) -> ClassificationResult {
        ClassificationResult {
            domain: Domain::Health,
            entity: Some(Entity::HealthTopic { topic }),
            matched_keywords: BTreeSet::new(),
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn without_llm_returns_topic_guidance() {
        let output = HealthHandler::new()
            .handle(&classification(HealthTopic::Medication, "remind me to take my pill"))
            .await
            .expect("health never fails");

        assert_eq!(
            output.facts.get("Topic").map(FactValue::render).as_deref(),
            Some("medication")
        );
        let analysis = output.facts.get(Facts::ANALYSIS).map(FactValue::render).expect("analysis");
        assert!(analysis.starts_with("You asked: \"remind me to take my pill\"."));
        assert!(output.providers.is_empty());
    }

    #[tokio::test]
    async fn symptom_prompt_reaches_llm() {
        let http = Arc::new(RecordingHttpClient::json(
            r#"{"choices":[{"message":{"content":"Likely a tension headache."}}]}"#,
        ));
        let llm = LlmClient::new(http.clone(), "https://llm.example.test/chat", "asi1-mini", "key");
        let handler = HealthHandler::new().with_llm(Arc::new(llm));

        let output = handler
            .handle(&classification(HealthTopic::Symptom, "i have a headache"))
            .await
            .expect("health never fails");

        assert_eq!(
            output.facts.get(Facts::ANALYSIS).map(FactValue::render).as_deref(),
            Some("Likely a tension headache.")
        );
        assert_eq!(output.providers, vec![ProviderId::Asi]);
        let body = http.recorded_requests()[0].body.clone().expect("body");
        assert!(body.contains("Based on the following symptoms: i have a headache"));
    }

    #[test]
    fn fallback_guidance_avoids_alarm_words() {
        for topic in [HealthTopic::Symptom, HealthTopic::Medication] {
            let text = health_fallback_guidance(topic, "i feel tired").to_lowercase();
            assert!(!text.contains("serious"));
            assert!(!text.contains("critical"));
            assert!(!text.contains("emergency"));
        }
    }

    #[tokio::test]
    async fn other_entities_produce_no_facts() {
        let mut result = classification(HealthTopic::Symptom, "hello");
        result.entity = None;

        let output = HealthHandler::new().handle(&result).await.expect("health never fails");
        assert!(output.facts.is_empty());
    }
}
