use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use skyprice_core::ValidationGate;
use skyprice_extraction::{ExtractorConfig, OpenAiExtractor, DEFAULT_BASE_URL, DEFAULT_MODEL};
use skyprice_observability::AppMetrics;
use skyprice_pricing::{SkyPriceClient, DEFAULT_PRICING_URL};
use skyprice_storage::MemoryStore;

use crate::ValuationAgent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(6);

pub type SkyPriceAgent = ValuationAgent<MemoryStore, OpenAiExtractor, SkyPriceClient>;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub pricing_url: String,
    pub http_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let openai_api_key = read("SKYPRICE_OPENAI_API_KEY")
            .or_else(|| read("OPENAI_API_KEY"))
            .context("SKYPRICE_OPENAI_API_KEY (or OPENAI_API_KEY) must be set")?;

        let http_timeout = match read("SKYPRICE_HTTP_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid SKYPRICE_HTTP_TIMEOUT_SECONDS `{raw}`"))?,
            None => 30,
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: read("SKYPRICE_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_model: read("SKYPRICE_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            pricing_url: read("SKYPRICE_PRICING_URL")
                .unwrap_or_else(|| DEFAULT_PRICING_URL.to_string()),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(self.http_timeout)
            .build()
            .context("failed to build http client")
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::new(self.openai_api_key.clone())
            .with_base_url(self.openai_base_url.clone())
            .with_model(self.openai_model.clone())
    }
}

pub fn build_agent(
    config: &ServiceConfig,
    store: Arc<MemoryStore>,
    metrics: Arc<AppMetrics>,
) -> Result<SkyPriceAgent> {
    let http_client = config.http_client()?;
    let extractor = OpenAiExtractor::new(http_client.clone(), config.extractor_config());
    let predictor = SkyPriceClient::new(http_client, config.pricing_url.clone());

    Ok(ValuationAgent::new(
        store,
        Arc::new(extractor),
        Arc::new(predictor),
        ValidationGate::default(),
        metrics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = ServiceConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")])).unwrap();
        assert_eq!(config.openai_api_key, "sk-1");
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.pricing_url, DEFAULT_PRICING_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn prefixed_variables_win() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-fallback"),
            ("SKYPRICE_OPENAI_API_KEY", "sk-primary"),
            ("SKYPRICE_PRICING_URL", "http://localhost:9000/predict"),
            ("SKYPRICE_HTTP_TIMEOUT_SECONDS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.openai_api_key, "sk-primary");
        assert_eq!(config.pricing_url, "http://localhost:9000/predict");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_key_or_bad_timeout_is_an_error() {
        assert!(ServiceConfig::from_lookup(lookup(&[])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("SKYPRICE_HTTP_TIMEOUT_SECONDS", "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn builds_agent_from_config() {
        let config = ServiceConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")])).unwrap();
        let agent = build_agent(&config, Arc::new(MemoryStore::new()), AppMetrics::shared()).unwrap();
        assert_eq!(agent.current_locale("nobody"), skyprice_core::Locale::Es);
    }
}
