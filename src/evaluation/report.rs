//! Suite-level aggregation of scenario comparisons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ComparisonMetrics, Winner};

/// Win rate above which P4 adoption is recommended.
pub const ADOPT_WIN_RATE: f64 = 0.7;

/// Win rate above which a gradual rollout is recommended.
pub const GRADUAL_WIN_RATE: f64 = 0.5;

/// P4/standard latency ratio above which P4 is flagged for optimization.
pub const LATENCY_RATIO_LIMIT: f64 = 2.0;

/// Compact per-scenario line kept in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Winner of the scenario.
    pub winner: Winner,
    /// Combined standard score.
    pub standard_combined: f64,
    /// Combined P4 score.
    pub p4_combined: f64,
    /// Relative gain of P4, in percent.
    pub improvement_percent: f64,
}

/// Aggregate outcome of one harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Number of scenarios evaluated.
    pub total_scenarios: usize,
    /// Scenarios won by P4.
    pub p4_wins: usize,
    /// Scenarios won by the standard responder.
    pub standard_wins: usize,
    /// Scenarios with no winner.
    pub ties: usize,
    /// Mean standard processing time.
    pub avg_standard_time_ms: f64,
    /// Mean P4 processing time.
    pub avg_p4_time_ms: f64,
    /// Mean improvement among P4 wins only.
    pub avg_improvement_percent: f64,
    /// P4 wins over total; a crude significance proxy.
    pub p4_win_rate: f64,
    /// Mean combined standard score.
    pub mean_standard_combined: f64,
    /// Mean combined P4 score.
    pub mean_p4_combined: f64,
    /// Qualitative recommendations from fixed thresholds.
    pub recommendations: Vec<String>,
    /// One line per scenario.
    pub scenarios: Vec<ScenarioOutcome>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl SuiteReport {
    /// Aggregate scenario comparisons into a report.
    pub fn from_metrics(
        run_id: impl Into<String>,
        started_at: DateTime<Utc>,
        metrics: &[ComparisonMetrics],
    ) -> Self {
        let count = |winner: Winner| metrics.iter().filter(|m| m.winner == winner).count();
        let p4_wins = count(Winner::P4);
        let standard_wins = count(Winner::Standard);
        let ties = count(Winner::Tie);
        let total_scenarios = metrics.len();

        let avg_standard_time_ms = mean(metrics.iter().map(|m| m.standard.processing_time_ms as f64));
        let avg_p4_time_ms = mean(metrics.iter().map(|m| m.p4.processing_time_ms as f64));
        let avg_improvement_percent = mean(
            metrics
                .iter()
                .filter(|m| m.winner == Winner::P4)
                .map(|m| m.improvement_percent),
        );
        let p4_win_rate = if total_scenarios == 0 {
            0.0
        } else {
            p4_wins as f64 / total_scenarios as f64
        };

        let recommendations = recommendations(p4_win_rate, avg_standard_time_ms, avg_p4_time_ms);

        Self {
            run_id: run_id.into(),
            started_at,
            total_scenarios,
            p4_wins,
            standard_wins,
            ties,
            avg_standard_time_ms,
            avg_p4_time_ms,
            avg_improvement_percent,
            p4_win_rate,
            mean_standard_combined: mean(metrics.iter().map(|m| m.standard_scores.combined())),
            mean_p4_combined: mean(metrics.iter().map(|m| m.p4_scores.combined())),
            recommendations,
            scenarios: metrics
                .iter()
                .map(|m| ScenarioOutcome {
                    scenario_id: m.scenario_id.clone(),
                    winner: m.winner,
                    standard_combined: m.standard_scores.combined(),
                    p4_combined: m.p4_scores.combined(),
                    improvement_percent: m.improvement_percent,
                })
                .collect(),
        }
    }
}

fn recommendations(win_rate: f64, standard_ms: f64, p4_ms: f64) -> Vec<String> {
    let mut out = Vec::new();

    if win_rate > ADOPT_WIN_RATE {
        out.push(format!(
            "P4 won {:.0}% of scenarios: adopt the reflective pipeline for compliance analysis",
            win_rate * 100.0
        ));
    } else if win_rate > GRADUAL_WIN_RATE {
        out.push(format!(
            "P4 won {:.0}% of scenarios: roll the reflective pipeline out gradually",
            win_rate * 100.0
        ));
    } else {
        out.push(format!(
            "P4 won {:.0}% of scenarios: the reflective pipeline needs further development",
            win_rate * 100.0
        ));
    }

    if standard_ms > 0.0 && p4_ms > standard_ms * LATENCY_RATIO_LIMIT {
        out.push(format!(
            "P4 is {:.1}x slower than the standard responder: optimize stage latency",
            p4_ms / standard_ms
        ));
    }

    out
}
