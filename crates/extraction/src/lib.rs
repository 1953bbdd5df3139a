//! Property detail extraction through an OpenAI-compatible chat completion API.

mod parse;
mod prompt;

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use skyprice_core::PropertyDraft;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use parse::parse_reply;
pub use prompt::extraction_instruction;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Every variant is reported to the user the same way; the distinction is for logs.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("extraction service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("extraction reply was empty")]
    EmptyReply,

    #[error("extraction reply is not valid JSON: {0}")]
    Parse(String),

    #[error("extraction reply is missing `{0}`")]
    MissingKey(&'static str),

    #[error("extraction reply has a non-scalar value for `{0}`")]
    UnexpectedValue(&'static str),
}

pub trait PropertyExtractor: Send + Sync {
    fn extract(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<PropertyDraft, ExtractionError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ExtractorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 600,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiExtractor {
    http_client: Client,
    config: ExtractorConfig,
}

impl OpenAiExtractor {
    pub fn new(http_client: Client, config: ExtractorConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl PropertyExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str) -> Result<PropertyDraft, ExtractionError> {
        info!(text = %text, model = %self.config.model, "extracting property details");

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: extraction_instruction(),
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "extraction request failed");
                ExtractionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "extraction service error");
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ExtractionError::EmptyReply)?;
        debug!(content = %content, "extraction reply");

        let draft = parse_reply(&content)?;
        info!(draft = ?draft, "extracted property draft");
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skyprice_core::Field;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
            ]
        })
    }

    fn extractor(server: &MockServer) -> OpenAiExtractor {
        OpenAiExtractor::new(
            Client::new(),
            ExtractorConfig::new("sk-test").with_base_url(server.uri()),
        )
    }

    #[test]
    fn config_defaults_match_the_bot() {
        let config = ExtractorConfig::new("sk").with_model("gpt-4o-mini");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 600);
    }

    #[tokio::test]
    async fn sends_instruction_and_text_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": extraction_instruction() },
                    { "role": "user", "content": "depa en Coyoacán" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"Size_Terrain":120,"Size_Construction":95,"Rooms":3,"Bathrooms":2,"Parking":1,"Age":null,"Lat":19.35,"Lng":-99.16,"Municipality":"Coyoacán"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let draft = extractor(&server).extract("depa en Coyoacán").await.unwrap();
        assert_eq!(draft.get(Field::Rooms), Some(&json!(3)));
        assert_eq!(draft.get(Field::Age), None);
    }

    #[tokio::test]
    async fn service_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let error = extractor(&server).extract("hola").await.unwrap_err();
        assert!(matches!(error, ExtractionError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn prose_reply_is_a_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("I could not find any apartment here.")),
            )
            .mount(&server)
            .await;

        let error = extractor(&server).extract("hola").await.unwrap_err();
        assert!(matches!(error, ExtractionError::Parse(_)));
    }

    #[tokio::test]
    async fn empty_choices_are_an_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let error = extractor(&server).extract("hola").await.unwrap_err();
        assert!(matches!(error, ExtractionError::EmptyReply));
    }
}
