//! Cloud-hosted judge backend (generateContent-style API)

use crate::backend::{BackendTier, ScoringBackend};
use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::prompts;
use async_trait::async_trait;
use ragmark_core::error::Result;
use ragmark_core::types::{EvalSample, Metric};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Judge backend over the cloud-hosted generateContent API
pub(crate) struct CloudBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl CloudBackend {
    pub(crate) fn new(config: &ScoringConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ScoringError::Config("Cloud backend requires a scoring credential".to_string())
        })?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ScoringError::Config(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.cloud_api_base_url.trim_end_matches('/').to_string(),
            model: config.cloud_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl ScoringBackend for CloudBackend {
    fn tier(&self) -> BackendTier {
        BackendTier::Cloud
    }

    async fn judge(&self, metric: Metric, sample: &EvalSample) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompts::judge_prompt(metric, sample),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        debug!("Sending {metric} judgement to cloud model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScoringError::Inference(format!("Judge request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ScoringError::Inference(format!(
                "Judge API returned error {status}: {error_text}"
            ))
            .into());
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            ScoringError::MalformedResponse(format!("Failed to parse judge response: {e}"))
        })?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}
