//! Client for the SkyPrice `/predict` endpoint.

use std::future::Future;

use reqwest::Client;
use serde_json::Value;
use skyprice_core::{PriceEstimate, PropertyRecord};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PRICING_URL: &str = "https://api.skyprice.xyz/predict";

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("pricing service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("pricing reply is not valid JSON: {0}")]
    Parse(String),

    #[error("pricing reply is missing `{0}`")]
    MissingEstimate(&'static str),

    #[error("pricing reply has an invalid value for `{0}`")]
    InvalidEstimate(&'static str),
}

pub trait PricePredictor: Send + Sync {
    fn predict(
        &self,
        record: &PropertyRecord,
    ) -> impl Future<Output = Result<PriceEstimate, PredictionError>> + Send;
}

#[derive(Clone)]
pub struct SkyPriceClient {
    http_client: Client,
    endpoint: String,
}

impl SkyPriceClient {
    pub fn new(http_client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

impl PricePredictor for SkyPriceClient {
    async fn predict(&self, record: &PropertyRecord) -> Result<PriceEstimate, PredictionError> {
        info!(record = ?record, endpoint = %self.endpoint, "requesting price prediction");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "pricing request failed");
                PredictionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "pricing service error");
            return Err(PredictionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PredictionError::Parse(e.to_string()))?;
        let estimate = parse_prediction(&payload)?;
        info!(estimate = ?estimate, "price prediction received");
        Ok(estimate)
    }
}

/// Reads the three model estimates. Each may arrive as a number or a numeric
/// string and must be finite and non-negative.
pub fn parse_prediction(payload: &Value) -> Result<PriceEstimate, PredictionError> {
    Ok(PriceEstimate {
        random_forest: estimate(payload, "random_forest")?,
        svm: estimate(payload, "svm")?,
        neural_network: estimate(payload, "neural_network")?,
    })
}

fn estimate(payload: &Value, key: &'static str) -> Result<f64, PredictionError> {
    let value = payload
        .get(key)
        .filter(|value| !value.is_null())
        .ok_or(PredictionError::MissingEstimate(key))?;

    let amount = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(PredictionError::InvalidEstimate(key)),
    }
}
