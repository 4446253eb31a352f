use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::prompts;
use super::reply::{parse_json_reply, unit_score};
use super::RelevanceJudge;
use crate::error::OracleError;
use crate::llm::{ChatModel, ChatOptions, Message};
use crate::types::{RelevanceVerdict, SearchHit};

#[derive(Deserialize)]
struct RelevanceReply {
    #[serde(default)]
    relevant: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
}

pub struct LlmRelevanceJudge {
    llm: Arc<dyn ChatModel>,
    temperature: f32,
}

impl LlmRelevanceJudge {
    pub fn new(llm: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { llm, temperature }
    }
}

#[async_trait]
impl RelevanceJudge for LlmRelevanceJudge {
    async fn judge_relevance(
        &self,
        topic: &str,
        context: &str,
        query: &str,
        hit: &SearchHit,
    ) -> Result<RelevanceVerdict, OracleError> {
        let messages = [
            Message::system(prompts::RELEVANCE_SYSTEM),
            Message::user(prompts::relevance(topic, context, query, hit)),
        ];
        let options = ChatOptions {
            temperature: self.temperature,
            max_tokens: 200,
        };
        let reply = self.llm.chat(&messages, options).await?;
        let parsed: RelevanceReply = parse_json_reply(&reply)?;

        Ok(RelevanceVerdict {
            relevant: parsed.relevant,
            confidence: unit_score("confidence", parsed.confidence)?,
            reason: parsed.reason,
        })
    }
}
