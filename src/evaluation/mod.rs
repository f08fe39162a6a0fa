//! Side-by-side evaluation of the standard responder and the P4 pipeline.
//!
//! The harness runs both paths over a fixed scenario set, scores each answer
//! with [`QualityScorer`], and aggregates the per-scenario comparisons into a
//! [`SuiteReport`].

mod harness;
mod report;
mod scenarios;
mod scorer;

pub use harness::*;
pub use report::*;
pub use scenarios::*;
pub use scorer::*;

use serde::{Deserialize, Serialize};

use crate::modes::{PipelineResult, SimpleResult};

/// Marker that identifies an agent-side failure in a response.
pub const ERROR_MARKER: &str = "[error]";

/// One agent's answer as seen by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTestResult {
    /// Answer text.
    pub response: String,
    /// Confidence reported by the agent.
    pub confidence: f64,
    /// Elapsed time of the agent run.
    pub processing_time_ms: u64,
    /// Follow-ups or recommendations returned with the answer.
    pub suggestions: Vec<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Number of reflection steps, when the agent reflects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_steps: Option<usize>,
}

impl AgentTestResult {
    /// Result standing in for an agent run that did not complete.
    pub fn failed(message: impl AsRef<str>) -> Self {
        Self {
            response: format!("{} {}", ERROR_MARKER, message.as_ref()),
            confidence: 0.0,
            processing_time_ms: 0,
            suggestions: Vec::new(),
            metadata: serde_json::Map::new(),
            reflection_steps: None,
        }
    }

    /// Failed result for an agent cut off at `timeout_ms`. The timeout is
    /// recorded as its latency.
    pub fn timed_out(agent: &str, timeout_ms: u64) -> Self {
        Self {
            processing_time_ms: timeout_ms,
            ..Self::failed(format!("{} agent timed out after {}ms", agent, timeout_ms))
        }
    }

    /// Whether the response carries the error marker.
    pub fn is_error(&self) -> bool {
        self.response.to_lowercase().contains(ERROR_MARKER)
    }
}

impl From<&SimpleResult> for AgentTestResult {
    fn from(result: &SimpleResult) -> Self {
        Self {
            response: result.message.clone(),
            confidence: result.confidence,
            processing_time_ms: result.processing_duration_ms,
            suggestions: result.recommendations.clone(),
            metadata: result.metadata.clone(),
            reflection_steps: None,
        }
    }
}

impl From<&PipelineResult> for AgentTestResult {
    fn from(result: &PipelineResult) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "step_count".to_string(),
            result.insights_summary.step_count.into(),
        );
        metadata.insert(
            "total_insights".to_string(),
            result.insights_summary.total_insights.into(),
        );
        metadata.insert(
            "total_concerns".to_string(),
            result.insights_summary.total_concerns.into(),
        );
        metadata.insert("fallback".to_string(), result.is_fallback().into());

        Self {
            response: result.final_message.clone(),
            confidence: result.confidence,
            processing_time_ms: result.processing_duration_ms,
            suggestions: result.suggestions.clone(),
            metadata,
            reflection_steps: Some(result.reflection_steps.len()),
        }
    }
}

/// Which side won a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// Standard responder.
    Standard,
    /// Reflective pipeline.
    P4,
    /// Neither cleared the margin.
    Tie,
}

impl Winner {
    /// Get the winner tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Standard => "standard",
            Winner::P4 => "p4",
            Winner::Tie => "tie",
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Standard responder answer.
    pub standard: AgentTestResult,
    /// P4 pipeline answer.
    pub p4: AgentTestResult,
    /// Scores for the standard answer.
    pub standard_scores: QualityScores,
    /// Scores for the P4 answer.
    pub p4_scores: QualityScores,
    /// Winner under the relative threshold.
    pub winner: Winner,
    /// Relative combined-score gain of P4 over standard, in percent.
    pub improvement_percent: f64,
}

/// Decide the winner from two combined scores.
///
/// A side wins only when it exceeds the other by more than `threshold`
/// relative to the other's score.
pub fn decide_winner(p4: f64, standard: f64, threshold: f64) -> Winner {
    if p4 > standard * (1.0 + threshold) {
        Winner::P4
    } else if standard > p4 * (1.0 + threshold) {
        Winner::Standard
    } else {
        Winner::Tie
    }
}

/// Relative gain of `p4` over `standard`, in percent.
pub fn improvement_percent(p4: f64, standard: f64) -> f64 {
    if standard > 0.0 {
        (p4 - standard) / standard * 100.0
    } else if p4 > 0.0 {
        100.0
    } else {
        0.0
    }
}
