//! Hybrid composition - analytical grounding, conversational framing.
//!
//! The analytical persona answers first; the conversational persona then
//! answers the original query with an excerpt of the analysis prepended.
//! The two calls are sequential.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::{truncate_chars, AnalysisType, Persona, SimpleResult, StandardMode};
use crate::query::Query;

/// Analytical recommendations appended to the conversational ones.
pub const ANALYTICAL_SUGGESTIONS_KEPT: usize = 2;

/// Output of a hybrid run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridResult {
    /// Correlation ID copied from the query.
    pub session_id: String,
    /// The conversational answer delivered to the caller.
    pub message: String,
    /// Mean of the two persona confidences.
    pub confidence: f64,
    /// Conversational recommendations, then the first analytical ones.
    pub suggestions: Vec<String>,
    /// Full analytical result.
    pub analytical: SimpleResult,
    /// Full conversational result.
    pub conversational: SimpleResult,
    /// Wall time of both calls.
    pub processing_duration_ms: u64,
}

impl HybridResult {
    /// Whether either persona fell back.
    pub fn is_degraded(&self) -> bool {
        self.analytical.fallback || self.conversational.fallback
    }
}

/// Sequential analytical + conversational handler.
#[derive(Clone)]
pub struct HybridMode {
    standard: StandardMode,
    excerpt_chars: usize,
}

impl HybridMode {
    /// Create a hybrid handler over a standard responder.
    pub fn new(standard: StandardMode, excerpt_chars: usize) -> Self {
        Self {
            standard,
            excerpt_chars,
        }
    }

    /// Characters of analytical output passed to the conversational call.
    pub fn excerpt_chars(&self) -> usize {
        self.excerpt_chars
    }

    /// Run both personas. Never fails; each side may individually fall back.
    pub async fn respond(&self, query: &Query) -> HybridResult {
        let start = Instant::now();

        let analytical = self.standard.respond(Persona::Analytical, query).await;

        let augmented = self.augment(query, &analytical.message);
        debug!(
            session_id = %query.session_id,
            excerpt_chars = self.excerpt_chars,
            "Handing analytical excerpt to conversational persona"
        );
        let conversational = self
            .standard
            .respond(Persona::Conversational, &augmented)
            .await;

        let confidence = (analytical.confidence + conversational.confidence) / 2.0;
        let suggestions = conversational
            .recommendations
            .iter()
            .chain(
                analytical
                    .recommendations
                    .iter()
                    .take(ANALYTICAL_SUGGESTIONS_KEPT),
            )
            .cloned()
            .collect();
        let processing_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            session_id = %query.session_id,
            confidence = confidence,
            analytical_fallback = analytical.fallback,
            conversational_fallback = conversational.fallback,
            latency_ms = processing_duration_ms,
            "Hybrid response completed"
        );

        HybridResult {
            session_id: query.session_id.clone(),
            message: conversational.message.clone(),
            confidence,
            suggestions,
            analytical,
            conversational,
            processing_duration_ms,
        }
    }

    /// The conversational call keeps the analysis type of the original
    /// question, not one inferred from the prepended notes.
    fn augment(&self, query: &Query, analysis: &str) -> Query {
        let mut augmented = query.clone();
        augmented.context.analysis_type = Some(AnalysisType::for_query(query).as_str().to_string());
        augmented.text = format!(
            "Analytical notes:\n{}\n\nOriginal question:\n{}",
            truncate_chars(analysis, self.excerpt_chars),
            query.text
        );
        augmented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MockCompletionClient;
    use crate::error::CompletionError;
    use crate::modes::{recommendation_templates, ModeCore};
    use crate::prompts::{ANALYTICAL_PERSONA_PROMPT, CONVERSATIONAL_PERSONA_PROMPT};
    use std::sync::Arc;
    use std::time::Duration;

    fn hybrid_with(mock: MockCompletionClient, excerpt_chars: usize) -> HybridMode {
        let core = ModeCore::new(Arc::new(mock), Duration::from_secs(1));
        HybridMode::new(StandardMode::new(core), excerpt_chars)
    }

    #[tokio::test]
    async fn test_hybrid_composes_both_personas() {
        let analysis = "A".repeat(500);
        let expected_excerpt = "A".repeat(300);

        let mut mock = MockCompletionClient::new();
        let reply = analysis.clone();
        mock.expect_generate()
            .times(1)
            .withf(|r| r.system_prompt == ANALYTICAL_PERSONA_PROMPT)
            .returning(move |_| Ok(reply.clone()));
        mock.expect_generate()
            .times(1)
            .withf(move |r| {
                r.system_prompt == CONVERSATIONAL_PERSONA_PROMPT
                    && r.user_prompt.contains(&expected_excerpt)
                    && !r.user_prompt.contains(&"A".repeat(301))
                    && r.user_prompt.contains("Original question:\n¿Qué hago?")
            })
            .returning(|_| Ok("Respuesta cercana".to_string()));

        let result = hybrid_with(mock, 300)
            .respond(&Query::new("¿Qué hago?").with_session("s-9"))
            .await;

        assert_eq!(result.session_id, "s-9");
        assert_eq!(result.message, "Respuesta cercana");
        assert!(!result.is_degraded());
        assert!((result.confidence - (0.9 + 0.85) / 2.0).abs() < 1e-9);

        let conv = &result.conversational.recommendations;
        assert_eq!(result.suggestions.len(), conv.len() + 2);
        assert_eq!(&result.suggestions[..conv.len()], &conv[..]);
        assert_eq!(
            &result.suggestions[conv.len()..],
            &result.analytical.recommendations[..2]
        );
    }

    #[tokio::test]
    async fn test_hybrid_analytical_failure_still_answers() {
        let mut mock = MockCompletionClient::new();
        mock.expect_generate()
            .times(1)
            .withf(|r| r.system_prompt == ANALYTICAL_PERSONA_PROMPT)
            .returning(|_| Err(CompletionError::Timeout { timeout_ms: 10 }));
        mock.expect_generate()
            .times(1)
            .withf(|r| r.system_prompt == CONVERSATIONAL_PERSONA_PROMPT)
            .returning(|_| Ok("Te ayudo igualmente".to_string()));

        let result = hybrid_with(mock, 300).respond(&Query::new("Hola")).await;

        assert!(result.is_degraded());
        assert!(result.analytical.fallback);
        assert_eq!(result.message, "Te ayudo igualmente");
        assert!((result.confidence - (0.7 + 0.85) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_augment_keeps_session_and_context() {
        let mode = hybrid_with(MockCompletionClient::new(), 5);
        let query = Query::new("original").with_session("abc");
        let augmented = mode.augment(&query, "análisis largo");

        assert_eq!(augmented.session_id, "abc");
        assert_eq!(augmented.context.analysis_type.as_deref(), Some("general"));
        assert_eq!(
            augmented.text,
            "Analytical notes:\nanáli\n\nOriginal question:\noriginal"
        );
    }

    #[tokio::test]
    async fn test_analysis_type_follows_original_question() {
        let mut mock = MockCompletionClient::new();
        mock.expect_generate()
            .times(1)
            .withf(|r| r.system_prompt == ANALYTICAL_PERSONA_PROMPT)
            .returning(|_| Ok("Hay un riesgo alto de sanción por la brecha.".to_string()));
        mock.expect_generate()
            .times(1)
            .withf(|r| r.system_prompt == CONVERSATIONAL_PERSONA_PROMPT)
            .returning(|_| Ok("Vamos paso a paso.".to_string()));

        let result = hybrid_with(mock, 300)
            .respond(&Query::new("Hola, ¿por dónde empiezo?"))
            .await;

        assert_eq!(result.analytical.analysis_type, AnalysisType::General);
        assert_eq!(result.conversational.analysis_type, AnalysisType::General);
        assert_eq!(
            result.conversational.recommendations,
            recommendation_templates(Persona::Conversational, AnalysisType::General)
                .iter()
                .take(result.conversational.recommendations.len())
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        );
    }
}
