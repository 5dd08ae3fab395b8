//! Inference service client.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::classify::response::{normalize_response, InferenceRequest, InferenceResponse};
use crate::classify::Classifier;
use crate::domain::TileClassification;
use crate::error::AppError;
use crate::io::ingest::IngestedBatch;

pub const DEFAULT_INFERENCE_URL: &str = "http://127.0.0.1:8001/predict";
pub const DEFAULT_TIMEOUT_SECS: u64 = 50;

/// Connection settings for the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_INFERENCE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl InferenceConfig {
    /// Read `INFERENCE_API_URL` / `INFERENCE_TIMEOUT_SECS` (a `.env` file is honored).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_vars(
            std::env::var("INFERENCE_API_URL").ok(),
            std::env::var("INFERENCE_TIMEOUT_SECS").ok(),
        )
    }

    fn from_vars(url: Option<String>, timeout: Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            config.url = url.trim().to_string();
        }
        if let Some(raw) = timeout {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| AppError::new(2, format!("Invalid INFERENCE_TIMEOUT_SECS '{raw}'.")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

pub struct HttpClassifier {
    client: Client,
    config: InferenceConfig,
}

impl HttpClassifier {
    pub fn new(config: InferenceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::new(InferenceConfig::from_env()?)
    }
}

impl Classifier for HttpClassifier {
    fn name(&self) -> &'static str {
        "http"
    }

    fn classify(&self, batch: &IngestedBatch) -> Result<Vec<TileClassification>, AppError> {
        let request = InferenceRequest::for_batch(batch);
        info!(url = %self.config.url, pairs = request.images.len(), "calling inference service");

        let resp = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .map_err(|e| AppError::new(4, format!("Inference call failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Inference request failed with status {}.", resp.status()),
            ));
        }

        let body: InferenceResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse inference response: {e}")))?;
        debug!(entries = body.damage_severities.len(), "inference response received");

        normalize_response(&body, &batch.pairs)
    }
}
