//! Shared fixtures for the end-to-end tests: a wiremock server standing in for
//! both the extraction service and the pricing service.

use anyhow::Result;
use axum::Router;
use serde_json::{json, Value};
use skyprice_agents::ServiceConfig;
use skyprice_api::{build_app, ApiConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";

pub struct Upstreams {
    pub server: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        let uri = self.server.uri();
        ServiceConfig {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: uri.clone(),
            openai_model: "gpt-4o".to_string(),
            pricing_url: format!("{uri}/predict"),
            http_timeout: std::time::Duration::from_secs(5),
        }
    }

    pub fn app(&self) -> Result<Router> {
        self.app_with_rate_limit(100)
    }

    pub fn app_with_rate_limit(&self, max_requests: usize) -> Result<Router> {
        let max_requests = max_requests.to_string();
        let api = ApiConfig::from_lookup(|key| match key {
            "SKYPRICE_API_KEY" => Some(API_KEY.to_string()),
            "SKYPRICE_RATE_LIMIT_MAX" => Some(max_requests.clone()),
            _ => None,
        });
        build_app(&self.service_config(), &api)
    }

    /// Every extraction call answers with `content` as the model's reply.
    pub async fn extraction_replies(&self, content: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    { "index": 0, "message": { "role": "assistant", "content": content } }
                ]
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn pricing_replies(&self, body: Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }
}

pub fn reference_reply() -> String {
    json!({
        "Size_Terrain": 100,
        "Size_Construction": 80,
        "Rooms": 2,
        "Bathrooms": 1,
        "Parking": 1,
        "Age": 10,
        "Lat": 19.39,
        "Lng": -99.16,
        "Municipality": "Benito Juárez"
    })
    .to_string()
}
