//! Mock retrieval client for testing

use crate::{Retrieval, RetrievalClient};
use async_trait::async_trait;
use ragmark_core::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted response queue for tests
enum ScriptedResponse {
    Success(Vec<String>),
    Failure(String),
}

/// Mock retrieval client that replays scripted responses in order
#[derive(Default)]
pub struct MockRetrievalClient {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl MockRetrievalClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful retrieval returning the given contexts
    pub fn push_success(&self, contexts: Vec<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(ScriptedResponse::Success(contexts));
    }

    /// Queue a failure, as surfaced after internal retries are exhausted
    pub fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(ScriptedResponse::Failure(message.to_string()));
    }

    /// The (question, top_k) pairs seen so far
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl RetrievalClient for MockRetrievalClient {
    async fn query(&self, question: &str, top_k: usize) -> Result<Retrieval> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((question.to_string(), top_k));

        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| Error::retrieval("MockRetrievalClient: no scripted response"))?;

        match scripted {
            ScriptedResponse::Success(contexts) => Ok(Retrieval {
                contexts,
                retrieval_time_ms: 12,
                cached: false,
            }),
            ScriptedResponse::Failure(message) => Err(Error::retrieval(message)),
        }
    }
}
