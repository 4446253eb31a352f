use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a fetched page.
pub const MAX_CONTENT_CHARS: usize = 5000;

fn neutral_axis() -> f64 {
    0.5
}

/// One claim statement from a perspective file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    #[serde(default)]
    pub text: String,
    /// Position on the bias axis, 0.0..=1.0.
    #[serde(default = "neutral_axis")]
    pub bias_x: f64,
    /// Editorial significance, 0.0..=1.0.
    #[serde(default = "neutral_axis")]
    pub significance_y: f64,
    #[serde(default)]
    pub color: String,
}

/// A raw search result. Serialized with the provider's `link` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "link", default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceVerdict {
    pub relevant: bool,
    pub confidence: f64,
    pub reason: String,
}

impl RelevanceVerdict {
    /// Verdict used when the judge cannot be reached or never answers sensibly.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            relevant: false,
            confidence: 0.0,
            reason: reason.into(),
        }
    }

    /// Relevance gate: on-topic and at least `threshold` confident.
    pub fn passes(&self, threshold: f64) -> bool {
        self.relevant && self.confidence >= threshold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustVerdict {
    pub trust_score: f64,
    pub source_type: String,
    pub reasoning: String,
}

impl TrustVerdict {
    pub const NEUTRAL_SCORE: f64 = 0.5;
    pub const UNKNOWN_SOURCE: &'static str = "Unknown";

    pub fn neutral(reasoning: impl Into<String>) -> Self {
        Self {
            trust_score: Self::NEUTRAL_SCORE,
            source_type: Self::UNKNOWN_SOURCE.to_string(),
            reasoning: reasoning.into(),
        }
    }
}

/// A search hit that passed the relevance gate, with trust score and page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLink {
    pub title: String,
    #[serde(rename = "link")]
    pub url: String,
    pub snippet: String,
    pub trust_score: f64,
    pub source_type: String,
    pub extracted_content: String,
}

impl EvidenceLink {
    pub fn new(hit: SearchHit, trust: TrustVerdict, extracted_content: String) -> Self {
        Self {
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
            trust_score: trust.trust_score,
            source_type: trust.source_type,
            extracted_content,
        }
    }
}

/// A claim item after evidence gathering, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedItem {
    pub claim: ClaimItem,
    pub links: Vec<EvidenceLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub text: String,
    pub bias_x: f64,
    pub significance_y: f64,
    pub combined_score: f64,
    pub color: String,
    pub relevant_links: Vec<EvidenceLink>,
}

/// The ranked output for one perspective file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub topic: String,
    pub source_file: String,
    pub processed_at: DateTime<Utc>,
    pub total_items: usize,
    pub items: Vec<ScoredItem>,
}

/// Topic and context text for a run, read from the run input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    pub topic: String,
    /// Background text handed to the relevance judge.
    #[serde(default, rename = "text")]
    pub context: String,
}

/// Claim items loaded from one perspective file.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveFile {
    /// File name, e.g. `leftist.json`.
    pub source_file: String,
    pub items: Vec<ClaimItem>,
}

/// `leftist.json` -> `relevant_leftist.json`
pub fn output_file_name(source_file: &str) -> String {
    let stem = source_file.strip_suffix(".json").unwrap_or(source_file);
    format!("relevant_{}.json", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_item_defaults_missing_axes() {
        let item: ClaimItem = serde_json::from_str(r#"{"text": "Claim"}"#).unwrap();
        assert_eq!(item.bias_x, 0.5);
        assert_eq!(item.significance_y, 0.5);
        assert_eq!(item.color, "");
    }

    #[test]
    fn evidence_link_serializes_url_as_link() {
        let link = EvidenceLink::new(
            SearchHit {
                title: "t".into(),
                url: "https://example.org/a".into(),
                snippet: "s".into(),
            },
            TrustVerdict::neutral("n/a"),
            "body".into(),
        );
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["link"], "https://example.org/a");
        assert!(json.get("url").is_none());
        assert_eq!(json["source_type"], "Unknown");
    }

    #[test]
    fn relevance_gate_is_inclusive_at_threshold() {
        let at = RelevanceVerdict {
            relevant: true,
            confidence: 0.7,
            reason: String::new(),
        };
        assert!(at.passes(0.7));
        assert!(!RelevanceVerdict { relevant: false, ..at.clone() }.passes(0.7));
        assert!(!RelevanceVerdict::rejected("x").passes(0.0));
    }

    #[test]
    fn output_name_uses_perspective_stem() {
        assert_eq!(output_file_name("rightist.json"), "relevant_rightist.json");
        assert_eq!(output_file_name("custom"), "relevant_custom.json");
    }
}
