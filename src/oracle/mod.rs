//! Oracle contracts: external judgment-producing calls treated as black boxes.
//!
//! Each trait is one attempt at one call. Retrying, rate limiting and the
//! fallback on terminal failure belong to the pipeline, so implementations
//! simply report failure through [`OracleError`].

pub mod prompts;
pub mod relevance;
pub mod rephrase;
pub mod reply;
pub mod trust;

use async_trait::async_trait;

use crate::error::OracleError;
use crate::types::{RelevanceVerdict, SearchHit, TrustVerdict};

pub use relevance::LlmRelevanceJudge;
pub use rephrase::LlmRephraser;
pub use trust::LlmTrustJudge;

#[async_trait]
pub trait Rephraser: Send + Sync {
    /// Rewrite `text` in the context of `topic`, keeping its meaning and stance.
    async fn rephrase(&self, topic: &str, text: &str) -> Result<String, OracleError>;
}

/// Language, country and safe-search settings for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLocale {
    pub language: String,
    pub country: String,
    pub safe: String,
}

impl Default for SearchLocale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: "us".to_string(),
            safe: "active".to_string(),
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        locale: &SearchLocale,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, OracleError>;
}

#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge_relevance(
        &self,
        topic: &str,
        context: &str,
        query: &str,
        hit: &SearchHit,
    ) -> Result<RelevanceVerdict, OracleError>;
}

#[async_trait]
pub trait TrustJudge: Send + Sync {
    async fn judge_trust(&self, hit: &SearchHit) -> Result<TrustVerdict, OracleError>;
}
