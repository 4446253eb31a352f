use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use evidence_trust::aggregate::write_result;
use evidence_trust::clock::ManualClock;
use evidence_trust::error::OracleError;
use evidence_trust::fetch::{ContentFetcher, PageFetcher, SESSION_UNAVAILABLE};
use evidence_trust::input::{load_perspectives, load_run_input};
use evidence_trust::llm::{ChatModel, ChatOptions, Message};
use evidence_trust::oracle::{
    LlmRelevanceJudge, LlmRephraser, LlmTrustJudge, SearchLocale, SearchProvider,
};
use evidence_trust::pipeline::{EvidencePipeline, PipelineSettings, Stages};
use evidence_trust::rate_limit::{RateLimitSettings, RateLimiter};
use evidence_trust::types::SearchHit;

/// Answers by system prompt: rephrase, relevance and trust each get a fixed reply.
struct ScriptedLlm {
    relevance: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl ChatModel for ScriptedLlm {
    async fn chat(&self, messages: &[Message], _options: ChatOptions) -> anyhow::Result<String> {
        let user = &messages[1].content;
        let system = &messages[0].content.to_lowercase();
        if system.contains("rephras") || system.contains("rewrite") {
            return Ok("Senate budget talks stall".to_string());
        }
        if system.contains("trust") || system.contains("credib") {
            return Ok(
                "```json\n{\"trust_score\": 0.9, \"source_type\": \"News organization\", \"trust_reasoning\": \"wire\"}\n```"
                    .to_string(),
            );
        }
        for (url, reply) in &self.relevance {
            if user.contains(url) {
                return Ok(reply.to_string());
            }
        }
        Ok(r#"{"relevant": false, "confidence": 0.1, "reason": "off topic"}"#.to_string())
    }
}

struct FixedSearch(Vec<SearchHit>);

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(
        &self,
        _query: &str,
        _locale: &SearchLocale,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, OracleError> {
        Ok(self.0.iter().take(max_results).cloned().collect())
    }
}

fn hit(url: &str) -> SearchHit {
    SearchHit {
        title: format!("Story at {}", url),
        url: url.to_string(),
        snippet: "Lawmakers met on Tuesday.".to_string(),
    }
}

fn write_data(dir: &std::path::Path) {
    std::fs::write(
        dir.join("input.json"),
        r#"{"topic": "Senate budget vote", "text": "The senate debated the budget."}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("common.json"),
        r##"[
            {"text": "Budget talks stall", "bias_x": 0.6, "significance_y": 0.5, "color": "#aa0000"},
            {"text": "", "bias_x": 0.9, "significance_y": 0.9},
            {"text": "Vote delayed again", "bias_x": 0.9, "significance_y": 0.8, "color": "#00aa00"}
        ]"##,
    )
    .unwrap();
}

#[tokio::test]
async fn full_run_writes_ranked_results() {
    let data = tempfile::tempdir().unwrap();
    write_data(data.path());
    let input = load_run_input(data.path()).unwrap();
    let names = vec!["common.json".to_string(), "leftist.json".to_string()];
    let files = load_perspectives(data.path(), &names).unwrap();
    assert_eq!(files.len(), 1);

    let llm: Arc<dyn ChatModel> = Arc::new(ScriptedLlm {
        relevance: HashMap::from([
            (
                "https://low.example",
                r#"{"relevant": true, "confidence": 0.65, "reason": "weak"}"#,
            ),
            (
                "https://high.example",
                r#"{"relevant": true, "confidence": 0.75, "reason": "strong"}"#,
            ),
        ]),
    });
    let clock = Arc::new(ManualClock::new());
    let stages = Stages {
        rephraser: LlmRephraser::new(llm.clone()),
        search: FixedSearch(vec![hit("https://low.example"), hit("https://high.example")]),
        relevance: LlmRelevanceJudge::new(llm.clone(), 0.1),
        trust: LlmTrustJudge::new(llm, 0.1),
        fetcher: ContentFetcher::unavailable(clock.clone()),
    };
    let settings = PipelineSettings {
        relevance_threshold: 0.7,
        delay_between_requests: Duration::from_millis(100),
        ..PipelineSettings::default()
    };
    let limiter = RateLimiter::new(
        RateLimitSettings {
            enabled: false,
            requests_per_minute: 10,
            wait_on_limit: true,
        },
        clock.clone(),
    );
    let pipeline = EvidencePipeline::new(stages, settings, limiter, clock.clone());

    let output = pipeline.run(&input, &files).await;
    assert_eq!(output.results.len(), 1);
    assert_eq!(output.summary.total_items(), 2);
    assert_eq!(output.summary.total_relevant_links, 2);
    // Per item: rephrase, search, two relevance checks, one trust check.
    assert_eq!(clock.sleeps().len(), 10);

    let out_dir = tempfile::tempdir().unwrap();
    let path = write_result(out_dir.path(), &output.results[0]).unwrap();
    assert!(path.ends_with("relevant_common.json"));

    let json: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["topic"], "Senate budget vote");
    assert_eq!(json["source_file"], "common.json");
    assert_eq!(json["total_items"], 2);

    let items = json["items"].as_array().unwrap();
    assert_eq!(items[0]["text"], "Vote delayed again");
    assert_eq!(items[0]["combined_score"], 0.72);
    assert_eq!(items[1]["combined_score"], 0.3);

    let links = items[1]["relevant_links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["link"], "https://high.example");
    assert_eq!(links[0]["trust_score"], 0.9);
    assert_eq!(links[0]["source_type"], "News organization");
    assert_eq!(links[0]["extracted_content"], SESSION_UNAVAILABLE);
}

#[tokio::test]
async fn unavailable_session_is_reported_per_link() {
    let fetcher = ContentFetcher::unavailable(Arc::new(ManualClock::new()));
    assert_eq!(fetcher.fetch("https://example.org").await, SESSION_UNAVAILABLE);
}
