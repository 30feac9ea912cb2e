//! Configuration for the scoring engine

/// Configuration for the metric scoring backends
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Credential for the cloud-hosted judge; when present the cloud
    /// model is the primary backend
    pub api_key: Option<String>,
    pub cloud_api_base_url: String,
    pub cloud_model: String,
    /// OpenAI-compatible endpoint of the locally hosted judge
    pub local_api_base_url: String,
    pub local_model: String,
    /// Per-request timeout; single-metric judgements can be slow
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cloud_api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            cloud_model: "gemini-2.5-flash-lite".to_string(),
            local_api_base_url: "http://localhost:11434/v1".to_string(),
            local_model: "qwen2.5:7b".to_string(),
            timeout_secs: 300,
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}
