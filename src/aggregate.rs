use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::types::{output_file_name, PipelineResult, ProcessedItem, ScoredItem};

/// `bias_x × significance_y`, rounded to 4 decimal places.
///
/// Rounds the exact binary value of the product: `0.30005` is stored as
/// `0.300049999…` and rounds to `0.3`. Never returns negative zero.
pub fn combined_score(bias_x: f64, significance_y: f64) -> f64 {
    let product = bias_x * significance_y;
    let rounded = format!("{:.4}", product).parse().unwrap_or(product);
    rounded + 0.0
}

pub fn score_item(item: ProcessedItem) -> ScoredItem {
    let ProcessedItem { claim, links } = item;
    ScoredItem {
        combined_score: combined_score(claim.bias_x, claim.significance_y),
        text: claim.text,
        bias_x: claim.bias_x,
        significance_y: claim.significance_y,
        color: claim.color,
        relevant_links: links,
    }
}

/// Builds ranked per-file results. One aggregator per run, so every result
/// shares the same `processed_at`.
pub struct ResultAggregator {
    topic: String,
    processed_at: DateTime<Utc>,
}

impl ResultAggregator {
    pub fn new(topic: &str, processed_at: DateTime<Utc>) -> Self {
        Self {
            topic: topic.to_string(),
            processed_at,
        }
    }

    /// Sort by combined score, highest first. Ties keep input order.
    pub fn rank(&self, source_file: &str, mut items: Vec<ScoredItem>) -> PipelineResult {
        items.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
        PipelineResult {
            topic: self.topic.clone(),
            source_file: source_file.to_string(),
            processed_at: self.processed_at,
            total_items: items.len(),
            items,
        }
    }

    pub fn aggregate(&self, source_file: &str, items: &[ProcessedItem]) -> PipelineResult {
        let scored = items.iter().cloned().map(score_item).collect();
        self.rank(source_file, scored)
    }
}

/// Pretty JSON with 4-space indentation.
pub fn to_json(result: &PipelineResult) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    result
        .serialize(&mut ser)
        .context("Failed to serialize result")?;
    Ok(buf)
}

/// Write `relevant_<perspective>.json` into `dir`, creating it if needed.
pub fn write_result(dir: &Path, result: &PipelineResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output folder {}", dir.display()))?;
    let path = dir.join(output_file_name(&result.source_file));
    std::fs::write(&path, to_json(result)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), items = result.total_items, "Saved results");
    Ok(path)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub source_file: String,
    pub items: usize,
    pub items_with_links: usize,
    pub relevant_links: usize,
    /// Set once the result has been written.
    pub output_path: Option<PathBuf>,
}

/// Per-file and overall tallies of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
    pub total_relevant_links: usize,
}

impl RunSummary {
    pub fn from_results(results: &[PipelineResult]) -> Self {
        let files: Vec<FileSummary> = results
            .iter()
            .map(|r| FileSummary {
                source_file: r.source_file.clone(),
                items: r.total_items,
                items_with_links: r
                    .items
                    .iter()
                    .filter(|i| !i.relevant_links.is_empty())
                    .count(),
                relevant_links: r.items.iter().map(|i| i.relevant_links.len()).sum(),
                output_path: None,
            })
            .collect();
        let total_relevant_links = files.iter().map(|f| f.relevant_links).sum();
        Self {
            files,
            total_relevant_links,
        }
    }

    pub fn total_items(&self) -> usize {
        self.files.iter().map(|f| f.items).sum()
    }

    /// Record where a file's result was written.
    pub fn set_output_path(&mut self, source_file: &str, path: PathBuf) {
        if let Some(f) = self.files.iter_mut().find(|f| f.source_file == source_file) {
            f.output_path = Some(path);
        }
    }

    pub fn log(&self) {
        for f in &self.files {
            let output = f
                .output_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not saved".to_string());
            info!(
                file = %f.source_file,
                items = f.items,
                items_with_links = f.items_with_links,
                relevant_links = f.relevant_links,
                output = %output,
                "Perspective summary"
            );
        }
        info!(
            files = self.files.len(),
            items = self.total_items(),
            relevant_links = self.total_relevant_links,
            "Processing complete"
        );
    }
}
