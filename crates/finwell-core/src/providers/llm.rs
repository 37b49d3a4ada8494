use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::{decode, fetch_body, ProviderId, SourceError};
use crate::config::ProviderSettings;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::retry::RetryConfig;

const TEMPERATURE: f64 = 0.7;
const LLM_TIMEOUT_MS: u64 = 30_000;

/// OpenAI-compatible chat completion client for the ASI endpoint.
pub struct LlmClient {
    http: Arc<dyn HttpClient>,
    url: String,
    model: String,
    api_key: String,
    timeout_ms: u64,
    retry: RetryConfig,
}

impl LlmClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_ms: LLM_TIMEOUT_MS,
            retry: RetryConfig::default(),
        }
    }

    /// `None` when no API key is configured; callers then use their fallback text.
    pub fn from_settings(http: Arc<dyn HttpClient>, settings: &ProviderSettings) -> Option<Self> {
        let api_key = settings.llm_api_key.clone()?;
        Some(
            Self::new(http, settings.llm_url.as_str(), settings.llm_model.as_str(), api_key)
                .with_timeout_ms(settings.timeout_ms.max(LLM_TIMEOUT_MS)),
        )
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one prompt, with an optional system message, and returns the trimmed reply.
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, SourceError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": messages,
        });

        let reply = self
            .retry
            .run("asi chat completion", || self.send(&body))
            .await?;
        info!(model = %self.model, chars = reply.len(), "obtained llm analysis");
        Ok(reply)
    }

    async fn send(&self, body: &Value) -> Result<String, SourceError> {
        let request = HttpRequest::post(self.url.as_str())
            .with_auth(&HttpAuth::BearerToken(self.api_key.clone()))
            .with_json_body(body)
            .with_timeout_ms(self.timeout_ms);

        let body = fetch_body(self.http.as_ref(), ProviderId::Asi, request).await?;
        debug!(bytes = body.len(), "llm response received");
        parse_completion(&body)
    }
}

/// Reads `choices[0].message.content`; a blank reply is an invalid response.
pub fn parse_completion(body: &str) -> Result<String, SourceError> {
    let payload: Value = decode(ProviderId::Asi, body)?;
    let content = payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| SourceError::invalid_response("llm response has no message content"))?;
    Ok(content.to_owned())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::providers::testing::RecordingHttpClient;
    use crate::providers::SourceErrorKind;

    const REPLY: &str = r#"{"choices":[{"message":{"role":"assistant","content":"  Steady outlook.  "}}]}"#;

    fn client(http: Arc<RecordingHttpClient>) -> LlmClient {
        LlmClient::new(http, "https://llm.example.test/v1/chat/completions", "asi1-mini", "sk-test")
            .with_retry(RetryConfig::fixed(Duration::from_millis(1), 2))
    }

    #[test]
    fn parses_first_choice_content() {
        assert_eq!(parse_completion(REPLY).expect("reply parses"), "Steady outlook.");
    }

    #[test]
    fn blank_content_is_invalid() {
        let err = parse_completion(r#"{"choices":[{"message":{"content":"   "}}]}"#)
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidResponse);
    }

    #[test]
    fn missing_key_disables_client() {
        let http = Arc::new(RecordingHttpClient::json(REPLY));
        assert!(LlmClient::from_settings(http, &ProviderSettings::default()).is_none());
    }

    #[tokio::test]
    async fn sends_bearer_token_and_model() {
        let http = Arc::new(RecordingHttpClient::json(REPLY));
        let reply = client(http.clone())
            .complete(Some("You are terse."), "Summarize BTC")
            .await
            .expect("completion succeeds");

        assert_eq!(reply, "Steady outlook.");
        let request = &http.recorded_requests()[0];
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer sk-test")
        );
        let body: Value =
            serde_json::from_str(request.body.as_deref().expect("body is set")).expect("json body");
        assert_eq!(body["model"], "asi1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Summarize BTC");
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let http = Arc::new(RecordingHttpClient::with_responses(vec![
            Ok(HttpResponse::with_status(503, "busy")),
            Err(HttpError::new("connection reset")),
            Ok(HttpResponse::ok_json(REPLY)),
        ]));

        let reply = client(http.clone())
            .complete(None, "Summarize ETH")
            .await
            .expect("third attempt succeeds");

        assert_eq!(reply, "Steady outlook.");
        assert_eq!(http.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let http = Arc::new(RecordingHttpClient::with_responses(vec![
            Ok(HttpResponse::with_status(401, "unauthorized")),
            Ok(HttpResponse::ok_json(REPLY)),
        ]));

        let err = client(http.clone())
            .complete(None, "Summarize ETH")
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert_eq!(http.recorded_requests().len(), 1);
    }
}
