use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::aggregate::{score_item, ResultAggregator, RunSummary};
use crate::clock::Clock;
use crate::fetch::PageFetcher;
use crate::keywords::extract_topic_keywords;
use crate::oracle::{RelevanceJudge, Rephraser, SearchLocale, SearchProvider, TrustJudge};
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::search::MAX_RESULTS;
use crate::types::{
    ClaimItem, EvidenceLink, PerspectiveFile, PipelineResult, ProcessedItem, RelevanceVerdict,
    RunInput, ScoredItem, SearchHit, TrustVerdict,
};

/// Run-level knobs the orchestrator reads.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub links_per_text: usize,
    pub relevance_threshold: f64,
    /// Pause after every oracle/search call, and the backoff unit for retries.
    pub delay_between_requests: Duration,
    /// Attempts per search query.
    pub max_retries: u32,
    /// Attempts per rephrase/relevance/trust call.
    pub oracle_attempts: u32,
    pub locale: SearchLocale,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            links_per_text: 10,
            relevance_threshold: 0.7,
            delay_between_requests: Duration::from_secs(1),
            max_retries: 3,
            oracle_attempts: 3,
            locale: SearchLocale::default(),
        }
    }
}

/// The external collaborators of a run.
pub struct Stages<R, S, V, T, F> {
    pub rephraser: R,
    pub search: S,
    pub relevance: V,
    pub trust: T,
    pub fetcher: F,
}

/// Where a claim item is in its pass through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Rephrasing,
    Searching,
    Evaluating { hit: usize, of: usize },
    Aggregating,
    Done,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStage::Rephrasing => f.write_str("rephrasing"),
            ItemStage::Searching => f.write_str("searching"),
            ItemStage::Evaluating { hit, of } => write!(f, "evaluating {}/{}", hit, of),
            ItemStage::Aggregating => f.write_str("aggregating"),
            ItemStage::Done => f.write_str("done"),
        }
    }
}

/// Read-only context shared by every item of a run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub topic: String,
    pub context: String,
    pub keywords: String,
}

impl RunContext {
    pub fn new(input: &RunInput) -> Self {
        let keywords = extract_topic_keywords(&input.topic);
        info!(keywords = %keywords, "Extracted keywords from topic");
        Self {
            topic: input.topic.clone(),
            context: input.context.clone(),
            keywords,
        }
    }

    /// Search query for a rephrased claim: the claim biased by topic keywords.
    pub fn query_for(&self, rephrased: &str) -> String {
        format!("{} {}", rephrased.trim(), self.keywords)
            .trim()
            .to_string()
    }
}

pub struct RunOutput {
    pub results: Vec<PipelineResult>,
    pub summary: RunSummary,
}

/// Sequences rephrase → search → {relevance → trust → fetch} per item and hit.
///
/// Items and hits are handled strictly one at a time. Every oracle attempt
/// first goes through the rate limiter, and every oracle/search call is
/// followed by the fixed inter-call pause whether it succeeded or not.
pub struct EvidencePipeline<R, S, V, T, F> {
    stages: Stages<R, S, V, T, F>,
    settings: PipelineSettings,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    search_retry: RetryExecutor,
    oracle_retry: RetryExecutor,
}

impl<R, S, V, T, F> EvidencePipeline<R, S, V, T, F>
where
    R: Rephraser,
    S: SearchProvider,
    V: RelevanceJudge,
    T: TrustJudge,
    F: PageFetcher,
{
    pub fn new(
        stages: Stages<R, S, V, T, F>,
        settings: PipelineSettings,
        limiter: RateLimiter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let backoff = settings.delay_between_requests;
        let search_retry = RetryExecutor::new(
            RetryPolicy::new(settings.max_retries, backoff),
            clock.clone(),
        );
        let oracle_retry = RetryExecutor::new(
            RetryPolicy::new(settings.oracle_attempts, backoff),
            clock.clone(),
        );
        Self {
            stages,
            settings,
            limiter,
            clock,
            search_retry,
            oracle_retry,
        }
    }

    /// Give the stages back, e.g. to close the fetcher's session explicitly.
    pub fn into_stages(self) -> Stages<R, S, V, T, F> {
        self.stages
    }

    /// Process every perspective file and rank the results.
    pub async fn run(&self, input: &RunInput, files: &[PerspectiveFile]) -> RunOutput {
        let ctx = RunContext::new(input);
        info!(
            topic = %ctx.topic,
            links_per_text = self.settings.links_per_text,
            relevance_threshold = self.settings.relevance_threshold,
            rate_limited = self.limiter.is_enabled(),
            files = files.len(),
            "Starting evidence pipeline"
        );

        let mut scored_files = Vec::with_capacity(files.len());
        for file in files {
            info!(file = %file.source_file, "Processing perspective file");
            let scored = self.process_file(&ctx, file).await;
            scored_files.push((file.source_file.clone(), scored));
        }

        let aggregator = ResultAggregator::new(&ctx.topic, Utc::now());
        let results: Vec<PipelineResult> = scored_files
            .into_iter()
            .map(|(source_file, scored)| aggregator.rank(&source_file, scored))
            .collect();
        let summary = RunSummary::from_results(&results);

        RunOutput { results, summary }
    }

    /// Process the items of one file in input order. Items with empty text
    /// are skipped.
    pub async fn process_file(&self, ctx: &RunContext, file: &PerspectiveFile) -> Vec<ScoredItem> {
        let total = file.items.len();
        let mut scored = Vec::with_capacity(total);
        for (idx, item) in file.items.iter().enumerate() {
            if item.text.trim().is_empty() {
                debug!(file = %file.source_file, index = idx, "Skipping item with empty text");
                continue;
            }
            info!(
                file = %file.source_file,
                "Processing item {}/{}: {}",
                idx + 1,
                total,
                preview(&item.text, 80)
            );
            let processed = self.process_item(ctx, item).await;
            self.log_stage(ItemStage::Aggregating);
            scored.push(score_item(processed));
            self.log_stage(ItemStage::Done);
        }
        scored
    }

    /// Gather evidence links for one claim item.
    pub async fn process_item(&self, ctx: &RunContext, item: &ClaimItem) -> ProcessedItem {
        self.log_stage(ItemStage::Rephrasing);
        let rephrased = self.rephrase(ctx, &item.text).await;
        debug!("Rephrased: {}", preview(&rephrased, 80));

        self.log_stage(ItemStage::Searching);
        let hits = self.search(&ctx.query_for(&rephrased)).await;
        info!(hits = hits.len(), "Search complete, checking relevance");

        let of = hits.len();
        let mut links = Vec::new();
        for (i, hit) in hits.into_iter().enumerate() {
            self.log_stage(ItemStage::Evaluating { hit: i + 1, of });
            if let Some(link) = self.evaluate_hit(ctx, &item.text, hit).await {
                links.push(link);
            }
        }

        ProcessedItem {
            claim: item.clone(),
            links,
        }
    }

    async fn rephrase(&self, ctx: &RunContext, text: &str) -> String {
        let topic = ctx.topic.as_str();
        let rephrased = self
            .oracle_retry
            .run_or_else(
                "rephrase",
                |_| async move {
                    self.limiter.acquire().await;
                    self.stages.rephraser.rephrase(topic, text).await
                },
                |e| {
                    warn!(error = %e, "Rephrasing failed, using original text");
                    text.to_string()
                },
            )
            .await;
        self.pause().await;
        rephrased
    }

    async fn search(&self, query: &str) -> Vec<SearchHit> {
        let max_results = self.settings.links_per_text.min(MAX_RESULTS);
        let locale = &self.settings.locale;
        let mut hits = self
            .search_retry
            .run_or_else(
                "search",
                |_| async move {
                    self.limiter.acquire().await;
                    self.stages.search.search(query, locale, max_results).await
                },
                |e| {
                    warn!(query = %preview(query, 50), error = %e, "Search failed, continuing with no links");
                    Vec::new()
                },
            )
            .await;
        self.pause().await;
        hits.truncate(max_results);
        hits
    }

    /// Relevance gate, then trust and content for hits that pass it.
    async fn evaluate_hit(
        &self,
        ctx: &RunContext,
        query_text: &str,
        hit: SearchHit,
    ) -> Option<EvidenceLink> {
        let verdict = self.judge_relevance(ctx, query_text, &hit).await;
        if !verdict.passes(self.settings.relevance_threshold) {
            debug!(
                confidence = verdict.confidence,
                reason = %verdict.reason,
                "Not relevant: {}",
                preview(&hit.title, 60)
            );
            return None;
        }
        info!(
            confidence = verdict.confidence,
            "Relevant: {}",
            preview(&hit.title, 60)
        );

        let trust = self.judge_trust(&hit).await;
        info!(
            trust_score = trust.trust_score,
            source_type = %trust.source_type,
            "Trust score checked"
        );

        let content = self.stages.fetcher.fetch(&hit.url).await;
        debug!(chars = content.chars().count(), "Extracted page content");

        Some(EvidenceLink::new(hit, trust, content))
    }

    async fn judge_relevance(
        &self,
        ctx: &RunContext,
        query_text: &str,
        hit: &SearchHit,
    ) -> RelevanceVerdict {
        let verdict = self
            .oracle_retry
            .run_or_else(
                "relevance",
                |_| async move {
                    self.limiter.acquire().await;
                    self.stages
                        .relevance
                        .judge_relevance(&ctx.topic, &ctx.context, query_text, hit)
                        .await
                },
                |e| {
                    warn!(url = %preview(&hit.url, 50), error = %e, "Relevance check failed");
                    RelevanceVerdict::rejected(format!("Error: {}", preview(&e.to_string(), 100)))
                },
            )
            .await;
        self.pause().await;
        verdict
    }

    async fn judge_trust(&self, hit: &SearchHit) -> TrustVerdict {
        let verdict = self
            .oracle_retry
            .run_or_else(
                "trust",
                |_| async move {
                    self.limiter.acquire().await;
                    self.stages.trust.judge_trust(hit).await
                },
                |e| {
                    warn!(url = %preview(&hit.url, 50), error = %e, "Trust check failed, using neutral score");
                    TrustVerdict::neutral("Error analyzing trust")
                },
            )
            .await;
        self.pause().await;
        verdict
    }

    async fn pause(&self) {
        self.clock.sleep(self.settings.delay_between_requests).await;
    }

    fn log_stage(&self, stage: ItemStage) {
        debug!(stage = %stage, "Item stage");
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
