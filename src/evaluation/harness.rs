//! Runs the standard responder and the P4 pipeline side by side.

use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    decide_winner, improvement_percent, AgentTestResult, ComparisonMetrics, QualityScorer,
    ScenarioCase, SuiteReport,
};
use crate::config::EvaluationConfig;
use crate::modes::{Persona, ReflectionMode, StandardMode};
use crate::query::Query;

/// Profile tag attached to harness queries.
pub const EVALUATION_PROFILE: &str = "evaluation";

/// Side-by-side evaluation harness.
#[derive(Clone)]
pub struct EvaluationHarness {
    standard: StandardMode,
    reflection: ReflectionMode,
    scorer: QualityScorer,
    config: EvaluationConfig,
}

impl EvaluationHarness {
    /// Create a harness over the two agents.
    pub fn new(
        standard: StandardMode,
        reflection: ReflectionMode,
        scorer: QualityScorer,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            standard,
            reflection,
            scorer,
            config,
        }
    }

    /// Run every scenario and aggregate the comparisons.
    ///
    /// One scenario's failure never blocks the next: a hung or failed
    /// agent scores zero for that scenario.
    pub async fn run_suite(&self, scenarios: &[ScenarioCase]) -> SuiteReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, scenarios = scenarios.len(), "Starting evaluation suite");

        let mut metrics = Vec::with_capacity(scenarios.len());
        for (index, scenario) in scenarios.iter().enumerate() {
            if index > 0 && self.config.pacing_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pacing_ms)).await;
            }
            metrics.push(self.run_scenario(&run_id, scenario).await);
        }

        let report = SuiteReport::from_metrics(run_id, started_at, &metrics);
        info!(
            run_id = %report.run_id,
            p4_wins = report.p4_wins,
            standard_wins = report.standard_wins,
            ties = report.ties,
            p4_win_rate = report.p4_win_rate,
            "Evaluation suite completed"
        );
        report
    }

    /// Run both agents on one scenario and score them.
    pub async fn run_scenario(&self, run_id: &str, scenario: &ScenarioCase) -> ComparisonMetrics {
        let query = Query::new(scenario.query.clone())
            .with_session(format!("{}-{}", run_id, scenario.id))
            .with_context(scenario.context.clone())
            .with_profile(EVALUATION_PROFILE);

        let limit = Duration::from_millis(self.config.scenario_timeout_ms);
        let (standard, p4) = tokio::join!(
            tokio::time::timeout(limit, self.standard.respond(Persona::Analytical, &query)),
            tokio::time::timeout(limit, self.reflection.reflect(&query)),
        );

        let standard = match standard {
            Ok(result) => AgentTestResult::from(&result),
            Err(_) => {
                warn!(scenario = %scenario.id, agent = "standard", timeout_ms = self.config.scenario_timeout_ms, "Agent timed out");
                AgentTestResult::timed_out("standard", self.config.scenario_timeout_ms)
            }
        };
        let p4 = match p4 {
            Ok(result) => AgentTestResult::from(&result),
            Err(_) => {
                warn!(scenario = %scenario.id, agent = "p4", timeout_ms = self.config.scenario_timeout_ms, "Agent timed out");
                AgentTestResult::timed_out("p4", self.config.scenario_timeout_ms)
            }
        };

        let standard_scores = self.scorer.score(&standard, scenario);
        let p4_scores = self.scorer.score(&p4, scenario);
        let (p4_combined, standard_combined) = (p4_scores.combined(), standard_scores.combined());
        let winner = decide_winner(p4_combined, standard_combined, self.config.winner_threshold);

        info!(
            scenario = %scenario.id,
            winner = %winner,
            standard_combined = standard_combined,
            p4_combined = p4_combined,
            "Scenario evaluated"
        );

        ComparisonMetrics {
            scenario_id: scenario.id.clone(),
            standard,
            p4,
            standard_scores,
            p4_scores,
            winner,
            improvement_percent: improvement_percent(p4_combined, standard_combined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionClient, CompletionRequest, MockCompletionClient};
    use crate::error::CompletionResult;
    use crate::evaluation::{default_scenarios, Winner};
    use crate::modes::ModeCore;
    use async_trait::async_trait;
    use std::sync::Arc;

    const RICH: &str = "\
Resumen del análisis.
1. Designa un responsable de cumplimiento antes de 30 días.
2. Implementa un canal de denuncias con confidencialidad y sin represalias.
3. Debe documentar cada investigación; se recomienda revisar el plazo de respuesta.
4. Forma a la plantilla sobre el protocolo.
Conclusión: revisa los riesgos de forma inmediata.";

    struct Hanging;

    #[async_trait]
    impl CompletionClient for Hanging {
        async fn generate(&self, _request: &CompletionRequest) -> CompletionResult<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    fn config(scenario_timeout_ms: u64) -> EvaluationConfig {
        EvaluationConfig {
            winner_threshold: 0.05,
            scenario_timeout_ms,
            pacing_ms: 0,
        }
    }

    fn core(client: Arc<dyn CompletionClient>) -> ModeCore {
        ModeCore::new(client, Duration::from_secs(5))
    }

    fn answering(text: &'static str) -> Arc<dyn CompletionClient> {
        let mut mock = MockCompletionClient::new();
        mock.expect_generate().returning(move |_| Ok(text.to_string()));
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_reflective_agent_wins_on_richer_answer() {
        let harness = EvaluationHarness::new(
            StandardMode::new(core(answering("Depende."))),
            ReflectionMode::new(core(answering(RICH))),
            QualityScorer::default(),
            config(5_000),
        );

        let scenario = &default_scenarios()[2];
        let metrics = harness.run_scenario("run", scenario).await;

        assert_eq!(metrics.scenario_id, "whistleblowing_channel");
        assert_eq!(metrics.winner, Winner::P4);
        assert!(metrics.improvement_percent > 5.0);
        assert_eq!(metrics.p4.reflection_steps, Some(5));
        assert!(metrics.standard.reflection_steps.is_none());
    }

    #[tokio::test]
    async fn test_hung_agent_scores_zero() {
        let harness = EvaluationHarness::new(
            StandardMode::new(core(answering(RICH))),
            ReflectionMode::new(core(Arc::new(Hanging))),
            QualityScorer::default(),
            config(50),
        );

        let metrics = harness.run_scenario("run", &default_scenarios()[0]).await;

        assert!(metrics.p4.is_error());
        assert_eq!(metrics.p4_scores.combined(), 0.0);
        assert_eq!(metrics.winner, Winner::Standard);
    }

    #[tokio::test]
    async fn test_hung_agent_latency_is_the_timeout() {
        let harness = EvaluationHarness::new(
            StandardMode::new(core(answering(RICH))),
            ReflectionMode::new(core(Arc::new(Hanging))),
            QualityScorer::default(),
            config(200),
        );

        let mut scenarios = default_scenarios();
        scenarios.truncate(1);
        let metrics = harness.run_scenario("run", &scenarios[0]).await;
        assert_eq!(metrics.p4.processing_time_ms, 200);
        assert!(metrics.standard.processing_time_ms < 200);

        let report = harness.run_suite(&scenarios).await;
        assert_eq!(report.avg_p4_time_ms, 200.0);
        assert!(report.avg_standard_time_ms < 200.0);
    }

    #[tokio::test]
    async fn test_run_suite_counts_every_scenario() {
        let harness = EvaluationHarness::new(
            StandardMode::new(core(answering(RICH))),
            ReflectionMode::new(core(answering(RICH))),
            QualityScorer::default(),
            config(5_000),
        );

        let scenarios = default_scenarios();
        let report = harness.run_suite(&scenarios).await;

        assert_eq!(report.total_scenarios, scenarios.len());
        assert_eq!(
            report.p4_wins + report.standard_wins + report.ties,
            scenarios.len()
        );
        assert_eq!(report.scenarios.len(), scenarios.len());
        assert!(!report.run_id.is_empty());
    }

    #[tokio::test]
    async fn test_queries_carry_scenario_context() {
        let mut mock = MockCompletionClient::new();
        mock.expect_generate()
            .withf(|r| r.user_prompt.contains("Industry: retail"))
            .returning(|_| Ok(RICH.to_string()));
        let client: Arc<dyn CompletionClient> = Arc::new(mock);

        let harness = EvaluationHarness::new(
            StandardMode::new(core(client.clone())),
            ReflectionMode::new(core(client)),
            QualityScorer::default(),
            config(5_000),
        );
        let metrics = harness.run_scenario("run", &default_scenarios()[0]).await;

        assert!(!metrics.standard.is_error());
        assert!(!metrics.p4.is_error());
    }
}
