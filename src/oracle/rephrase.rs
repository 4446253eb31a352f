use std::sync::Arc;

use async_trait::async_trait;

use super::prompts;
use super::reply::strip_code_fence;
use super::Rephraser;
use crate::error::OracleError;
use crate::llm::{ChatModel, ChatOptions, Message};

const OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.3,
    max_tokens: 150,
};

pub struct LlmRephraser {
    llm: Arc<dyn ChatModel>,
}

impl LlmRephraser {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Rephraser for LlmRephraser {
    async fn rephrase(&self, topic: &str, text: &str) -> Result<String, OracleError> {
        let messages = [
            Message::system(prompts::REPHRASE_SYSTEM),
            Message::user(prompts::rephrase(topic, text)),
        ];
        let reply = self.llm.chat(&messages, OPTIONS).await?;

        let rephrased = strip_code_fence(&reply).trim_matches('"').trim();
        if rephrased.is_empty() {
            return Err(OracleError::malformed("empty rephrase"));
        }
        Ok(rephrased.to_string())
    }
}
