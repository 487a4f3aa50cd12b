//! Report, settings, and error types for analysis runs.

use crate::config::Config;
use crate::processing::{Chunk, ChunkingError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that terminate an analysis run before any backend call is made.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Nothing worth analyzing remained after sanitizing the input.
    #[error("no valid text found: {chars} characters after sanitizing, at least {min} required")]
    InsufficientText {
        /// Characters left after sanitizing.
        chars: usize,
        /// Minimum accepted length.
        min: usize,
    },
    /// Chunking rejected the configured budget.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Tunables for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Maximum characters per chunk.
    pub max_chars: usize,
    /// Characters copied from the previous chunk into the next.
    pub overlap_chars: usize,
    /// Output cap for each per-chunk invocation.
    pub chunk_output_tokens: u32,
    /// Output cap for the consolidation invocation.
    pub consolidation_output_tokens: u32,
    /// Output cap for the risk extraction invocation.
    pub risk_output_tokens: u32,
    /// Output cap for the simplified risk retry.
    pub retry_output_tokens: u32,
    /// Minimum number of risks reported by a completed run.
    pub min_risks: usize,
    /// Characters of the document included in the simplified risk retry.
    pub retry_prefix_chars: usize,
    /// Sanitized inputs shorter than this are rejected.
    pub min_input_chars: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_chars: 3000,
            overlap_chars: 200,
            chunk_output_tokens: 1024,
            consolidation_output_tokens: 1024,
            risk_output_tokens: 1024,
            retry_output_tokens: 512,
            min_risks: 3,
            retry_prefix_chars: 2000,
            min_input_chars: 10,
        }
    }
}

impl AnalysisSettings {
    /// Derive settings from the runtime configuration, keeping defaults for the rest.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chars: config.chunk_max_chars,
            overlap_chars: config.chunk_overlap_chars,
            min_risks: config.min_risk_count,
            ..Self::default()
        }
    }
}

/// Output of one backend invocation after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ModelOutput {
    /// Output parsed as a JSON object or array.
    Structured(Value),
    /// Output that could not be parsed, kept verbatim.
    Raw(String),
    /// The invocation failed for a reason other than quota exhaustion.
    Error(String),
}

impl ModelOutput {
    /// Placeholder used when consolidation was never reached.
    pub fn empty_summary() -> Self {
        Self::Structured(json!({ "summary": [] }))
    }

    /// Plain JSON rendering used when feeding results back into a prompt.
    pub fn to_prompt_value(&self) -> Value {
        match self {
            Self::Structured(value) => value.clone(),
            Self::Raw(text) => json!({ "raw": text }),
            Self::Error(message) => json!({ "error": message }),
        }
    }

    /// Extract `{text, excerpt}` points from a `summary` or `bullets` array.
    pub fn summary_points(&self) -> Vec<SummaryPoint> {
        let Self::Structured(value) = self else {
            return Vec::new();
        };
        let items = value
            .get("summary")
            .or_else(|| value.get("bullets"))
            .and_then(Value::as_array);
        items
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<SummaryPoint>(item.clone()).ok())
                    .filter(|point| !point.text.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One bullet of a chunk summary or of the consolidated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPoint {
    /// Plain-English explanation.
    pub text: String,
    /// Supporting quote from the document.
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// Severity attached to a risk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Severity {
    /// Minor impact (also used for unrecognized labels).
    #[default]
    Low,
    /// Noticeable impact.
    Medium,
    /// Serious impact.
    High,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// A concerning clause reported by risk extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    /// Category label, e.g. `Arbitration Clause`.
    #[serde(rename = "type")]
    pub category: String,
    /// Impact rating.
    #[serde(default)]
    pub severity: Severity,
    /// Quote from the document.
    #[serde(default)]
    pub excerpt: String,
    /// Why the clause matters.
    #[serde(default)]
    pub note: String,
    /// Generic low-confidence item added to reach the minimum count.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

/// Per-chunk record kept in the report for audit and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// The chunk that was dispatched.
    #[serde(flatten)]
    pub chunk: Chunk,
    /// What the backend returned for it.
    pub result: ModelOutput,
}

/// Terminal state of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every stage ran.
    Complete,
    /// The backend reported quota exhaustion and remaining work was skipped.
    QuotaExhausted,
}

/// Pipeline stage, used to record where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Per-chunk summaries.
    ChunkSummaries,
    /// Consolidation of chunk summaries.
    Consolidation,
    /// Risk extraction over the full text.
    RiskExtraction,
    /// Simplified risk retry over the document prefix.
    RiskRetry,
}

/// Exported result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Unique identifier of the run.
    pub run_id: String,
    /// RFC 3339 timestamp of report creation.
    pub generated_at: String,
    /// Whether the run completed or stopped on quota exhaustion.
    pub status: AnalysisStatus,
    /// Stage at which quota exhaustion stopped the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhausted_at: Option<AnalysisStage>,
    /// Fingerprint of the sanitized text.
    pub fingerprint: String,
    /// Length of the sanitized text in characters.
    pub text_chars: usize,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Chunk results collected before the run ended, in order.
    pub chunks: Vec<ChunkRecord>,
    /// Consolidated summary (an empty placeholder when never reached).
    pub summary: ModelOutput,
    /// Risks found in the document.
    pub risks: Vec<Risk>,
    /// Wall-clock duration in seconds, rounded to one decimal.
    pub elapsed_seconds: f64,
}

impl AnalysisReport {
    /// Whether the run stopped early on quota exhaustion.
    pub fn is_quota_exhausted(&self) -> bool {
        self.status == AnalysisStatus::QuotaExhausted
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a report previously produced by [`AnalysisReport::to_json_pretty`].
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_loosely() {
        let risk: Risk = serde_json::from_value(json!({
            "type": "Arbitration Clause",
            "severity": "HIGH",
            "excerpt": "binding arbitration",
            "note": "No court"
        }))
        .expect("risk");
        assert_eq!(risk.severity, Severity::High);
        assert!(!risk.placeholder);

        let risk: Risk = serde_json::from_value(json!({ "type": "Fees", "severity": "severe" }))
            .expect("risk");
        assert_eq!(risk.severity, Severity::Low);
    }

    #[test]
    fn summary_points_read_summary_and_bullets() {
        let consolidated = ModelOutput::Structured(json!({
            "summary": [{ "text": "Data is shared", "excerpt": "we share" }, { "text": "" }]
        }));
        assert_eq!(consolidated.summary_points().len(), 1);

        let chunk = ModelOutput::Structured(json!({ "bullets": [{ "text": "Fees apply" }] }));
        assert_eq!(chunk.summary_points()[0].text, "Fees apply");
        assert!(ModelOutput::Raw("text".into()).summary_points().is_empty());
    }

    #[test]
    fn prompt_value_flattens_variants() {
        assert_eq!(
            ModelOutput::Raw("plain".into()).to_prompt_value(),
            json!({ "raw": "plain" })
        );
        assert_eq!(
            ModelOutput::empty_summary().to_prompt_value(),
            json!({ "summary": [] })
        );
    }
}
