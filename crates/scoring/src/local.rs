//! Locally hosted judge backend (OpenAI-compatible API)

use crate::backend::{BackendTier, ScoringBackend};
use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::prompts;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use ragmark_core::error::Result;
use ragmark_core::types::{EvalSample, Metric};
use tracing::debug;

/// Judge backend over an OpenAI-compatible local server (Ollama, vLLM)
pub(crate) struct LocalBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl LocalBackend {
    pub(crate) fn new(config: &ScoringConfig) -> Result<Self> {
        let openai_config = OpenAIConfig::new().with_api_base(&config.local_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.local_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl ScoringBackend for LocalBackend {
    fn tier(&self) -> BackendTier {
        BackendTier::Local
    }

    async fn judge(&self, metric: Metric, sample: &EvalSample) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompts::judge_prompt(metric, sample))
            .build()
            .map_err(|e| ScoringError::Config(format!("Failed to build judge message: {e}")))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .max_completion_tokens(self.max_output_tokens)
            .build()
            .map_err(|e| ScoringError::Config(format!("Failed to build judge request: {e}")))?;

        debug!("Sending {metric} judgement to local model {}", self.model);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ScoringError::Inference(format!("Judge request failed: {e}")))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(text)
    }
}
