//! Scripted `LlmAdapter` for strategy tests, grounded in
//! `restflow-ai/src/llm/mock_client.rs`'s queue-of-canned-responses shape.

use async_trait::async_trait;
use kodus_traits::llm::{LlmAdapter, LlmCall, LlmMessage, LlmResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct MockLlmAdapter {
    responses: Mutex<VecDeque<LlmResponse>>,
}

impl MockLlmAdapter {
    pub fn with_responses(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    async fn call(&self, _messages: &[LlmMessage], _options: &LlmCall) -> anyhow::Result<LlmResponse> {
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock llm adapter ran out of scripted responses"))
    }
}
