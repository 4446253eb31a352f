use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::prompts;
use super::reply::{parse_json_reply, unit_score};
use super::TrustJudge;
use crate::error::OracleError;
use crate::llm::{ChatModel, ChatOptions, Message};
use crate::types::{SearchHit, TrustVerdict};

#[derive(Deserialize)]
struct TrustReply {
    trust_score: Option<f64>,
    source_type: Option<String>,
    #[serde(default, alias = "reasoning")]
    trust_reasoning: String,
}

pub struct LlmTrustJudge {
    llm: Arc<dyn ChatModel>,
    temperature: f32,
}

impl LlmTrustJudge {
    pub fn new(llm: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { llm, temperature }
    }
}

#[async_trait]
impl TrustJudge for LlmTrustJudge {
    async fn judge_trust(&self, hit: &SearchHit) -> Result<TrustVerdict, OracleError> {
        let messages = [
            Message::system(prompts::TRUST_SYSTEM),
            Message::user(prompts::trust(hit)),
        ];
        let options = ChatOptions {
            temperature: self.temperature,
            max_tokens: 250,
        };
        let reply = self.llm.chat(&messages, options).await?;
        let parsed: TrustReply = parse_json_reply(&reply)?;

        let trust_score = parsed.trust_score.unwrap_or(TrustVerdict::NEUTRAL_SCORE);
        let source_type = parsed
            .source_type
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| TrustVerdict::UNKNOWN_SOURCE.to_string());

        Ok(TrustVerdict {
            trust_score: unit_score("trust_score", trust_score)?,
            source_type,
            reasoning: parsed.trust_reasoning,
        })
    }
}
