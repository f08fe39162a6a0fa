//! Standard responder - one completion call per query.
//!
//! This is the non-reflective baseline: a persona-specific system prompt,
//! marker-based key-finding extraction, and static recommendation templates
//! chosen by [`AnalysisType`].

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{FailureInfo, ModeCore, Persona};
use crate::completion::CompletionRequest;
use crate::prompts::{
    ANALYTICAL_FALLBACK, ANALYTICAL_PERSONA_PROMPT, CONVERSATIONAL_FALLBACK,
    CONVERSATIONAL_PERSONA_PROMPT,
};
use crate::query::Query;
use crate::signals::extract_key_findings;

/// Maximum key findings reported per response.
pub const MAX_KEY_FINDINGS: usize = 5;

/// Maximum recommendation templates attached per response.
pub const MAX_RECOMMENDATIONS: usize = 4;

const GENERIC_FALLBACK_SUGGESTIONS: &[&str] = &[
    "Share a bit more context about your company and sector",
    "Tell us which regulation or situation worries you most",
    "Try again in a few minutes",
];

/// Kind of analysis requested, used to pick recommendation templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// No specific focus.
    General,
    /// Risk identification and prioritization.
    RiskAssessment,
    /// Policy or code-of-conduct review.
    PolicyReview,
    /// Staff training programs.
    Training,
    /// Incidents, breaches and whistleblowing reports.
    IncidentResponse,
}

impl AnalysisType {
    /// Get the analysis type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::General => "general",
            AnalysisType::RiskAssessment => "risk_assessment",
            AnalysisType::PolicyReview => "policy_review",
            AnalysisType::Training => "training",
            AnalysisType::IncidentResponse => "incident_response",
        }
    }

    /// Use the context's `analysis_type` when it names a known type,
    /// otherwise infer from the query text.
    pub fn for_query(query: &Query) -> Self {
        query
            .context
            .analysis_type
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| Self::infer(&query.text))
    }

    /// Keyword inference; the most specific match wins.
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

        if has(&["incidente", "incident", "denuncia", "brecha", "breach", "whistleblow"]) {
            AnalysisType::IncidentResponse
        } else if has(&["riesgo", "risk"]) {
            AnalysisType::RiskAssessment
        } else if has(&["política", "politica", "policy", "código ético", "code of conduct"]) {
            AnalysisType::PolicyReview
        } else if has(&["formación", "formacion", "capacitación", "capacitacion", "training"]) {
            AnalysisType::Training
        } else {
            AnalysisType::General
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "general" => Ok(AnalysisType::General),
            "risk_assessment" | "risk" => Ok(AnalysisType::RiskAssessment),
            "policy_review" | "policy" => Ok(AnalysisType::PolicyReview),
            "training" => Ok(AnalysisType::Training),
            "incident_response" | "incident" => Ok(AnalysisType::IncidentResponse),
            _ => Err(format!("Unknown analysis type: {}", s)),
        }
    }
}

/// Static recommendation templates for a persona and analysis type.
pub fn recommendation_templates(persona: Persona, analysis: AnalysisType) -> &'static [&'static str] {
    match (persona, analysis) {
        (Persona::Analytical, AnalysisType::General) => &[
            "Map the regulations that apply to your activity",
            "Designate a compliance owner with a clear mandate",
            "Document policies and controls in a single register",
            "Schedule a periodic compliance review",
        ],
        (Persona::Analytical, AnalysisType::RiskAssessment) => &[
            "Build a risk matrix rating likelihood and impact",
            "Treat the high-impact risks first",
            "Assign an owner and a deadline to each mitigation",
            "Reassess the risk map every six months",
        ],
        (Persona::Analytical, AnalysisType::PolicyReview) => &[
            "Compare current policies against the applicable regulation",
            "Close each gap with a dated action item",
            "Approve the updated policies at management level",
            "Communicate the changes and collect acknowledgements",
        ],
        (Persona::Analytical, AnalysisType::Training) => &[
            "Identify the roles most exposed to compliance risk",
            "Design role-specific training modules",
            "Track completion and test understanding",
            "Refresh the training every year",
        ],
        (Persona::Analytical, AnalysisType::IncidentResponse) => &[
            "Contain the incident and preserve the evidence",
            "Check notification duties and their deadlines",
            "Investigate root causes with an independent reviewer",
            "Update controls to prevent recurrence",
        ],
        (Persona::Conversational, AnalysisType::General) => &[
            "Would you like a step-by-step plan?",
            "Do you want to know which regulations apply to you?",
            "Shall we look at the main risks for your company?",
        ],
        (Persona::Conversational, AnalysisType::RiskAssessment) => &[
            "Would you like help building a simple risk map?",
            "Shall we go through your highest risks one by one?",
            "Do you want examples of controls for these risks?",
        ],
        (Persona::Conversational, AnalysisType::PolicyReview) => &[
            "Would you like a checklist to review your policies?",
            "Shall we draft the key sections of the policy together?",
            "Do you want tips to communicate it to your team?",
        ],
        (Persona::Conversational, AnalysisType::Training) => &[
            "Would you like a proposal for a training plan?",
            "Shall we pick the topics your team needs most?",
            "Do you want ideas to measure the training's impact?",
        ],
        (Persona::Conversational, AnalysisType::IncidentResponse) => &[
            "Do you want the immediate steps to take now?",
            "Shall we check whether you must notify an authority?",
            "Would you like help documenting what happened?",
        ],
    }
}

/// Result of a single-pass response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleResult {
    /// Correlation ID copied from the query.
    pub session_id: String,
    /// Persona that produced the answer.
    pub persona: Persona,
    /// Analysis type used for the templates.
    pub analysis_type: AnalysisType,
    /// The answer text.
    pub message: String,
    /// Persona-dependent constant, not a measured score.
    pub confidence: f64,
    /// Up to five marker lines from the answer.
    pub key_findings: Vec<String>,
    /// Up to four template recommendations.
    pub recommendations: Vec<String>,
    /// Wall time of the call.
    pub processing_duration_ms: u64,
    /// Whether the canned fallback was returned.
    pub fallback: bool,
    /// Why the fallback triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureInfo>,
    /// Flat descriptive metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Single-pass responder.
#[derive(Clone)]
pub struct StandardMode {
    /// Core infrastructure (completion client and timeout).
    core: ModeCore,
}

impl StandardMode {
    /// Create a new standard responder
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Fixed confidence reported for a successful answer.
    pub fn confidence_for(persona: Persona) -> f64 {
        match persona {
            Persona::Conversational => 0.85,
            Persona::Analytical => 0.9,
        }
    }

    /// Fixed confidence reported for the canned fallback.
    pub fn fallback_confidence_for(persona: Persona) -> f64 {
        match persona {
            Persona::Conversational => 0.75,
            Persona::Analytical => 0.7,
        }
    }

    /// Answer `query` with the given persona. Never fails: completion errors
    /// degrade to a canned answer with reduced confidence.
    pub async fn respond(&self, persona: Persona, query: &Query) -> SimpleResult {
        let start = Instant::now();
        let analysis_type = AnalysisType::for_query(query);

        debug!(
            session_id = %query.session_id,
            persona = %persona,
            analysis_type = %analysis_type,
            "Processing standard response"
        );

        if query.is_blank() {
            warn!(session_id = %query.session_id, persona = %persona, "Blank query, returning fallback");
            return self.fallback(
                persona,
                query,
                analysis_type,
                FailureInfo::blank_query(persona.as_str()),
                start,
            );
        }

        let request = self.build_request(persona, query, analysis_type);
        let message = match self.core.generate(&request, persona.as_str()).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    session_id = %query.session_id,
                    persona = %persona,
                    error = %e,
                    "Standard response failed, returning fallback"
                );
                return self.fallback(
                    persona,
                    query,
                    analysis_type,
                    FailureInfo::from_error(persona.as_str(), &e),
                    start,
                );
            }
        };

        let key_findings = extract_key_findings(&message, MAX_KEY_FINDINGS);
        let recommendations: Vec<String> = recommendation_templates(persona, analysis_type)
            .iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|s| s.to_string())
            .collect();

        let mut metadata = serde_json::Map::new();
        metadata.insert("persona".to_string(), persona.as_str().into());
        metadata.insert("analysis_type".to_string(), analysis_type.as_str().into());
        metadata.insert("key_findings_count".to_string(), key_findings.len().into());
        metadata.insert(
            "word_count".to_string(),
            message.split_whitespace().count().into(),
        );

        let processing_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            session_id = %query.session_id,
            persona = %persona,
            key_findings = key_findings.len(),
            latency_ms = processing_duration_ms,
            "Standard response completed"
        );

        SimpleResult {
            session_id: query.session_id.clone(),
            persona,
            analysis_type,
            message,
            confidence: Self::confidence_for(persona),
            key_findings,
            recommendations,
            processing_duration_ms,
            fallback: false,
            failure: None,
            metadata,
        }
    }

    fn fallback(
        &self,
        persona: Persona,
        query: &Query,
        analysis_type: AnalysisType,
        failure: FailureInfo,
        start: Instant,
    ) -> SimpleResult {
        let message = match persona {
            Persona::Conversational => CONVERSATIONAL_FALLBACK,
            Persona::Analytical => ANALYTICAL_FALLBACK,
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("persona".to_string(), persona.as_str().into());
        metadata.insert("fallback".to_string(), true.into());

        SimpleResult {
            session_id: query.session_id.clone(),
            persona,
            analysis_type,
            message: message.to_string(),
            confidence: Self::fallback_confidence_for(persona),
            key_findings: Vec::new(),
            recommendations: GENERIC_FALLBACK_SUGGESTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            processing_duration_ms: start.elapsed().as_millis() as u64,
            fallback: true,
            failure: Some(failure),
            metadata,
        }
    }

    fn build_request(
        &self,
        persona: Persona,
        query: &Query,
        analysis_type: AnalysisType,
    ) -> CompletionRequest {
        let context = query.context.prompt_block();

        match persona {
            Persona::Conversational => CompletionRequest::new(
                CONVERSATIONAL_PERSONA_PROMPT,
                format!("{}{}", context, query.text),
            )
            .with_max_output_tokens(800)
            .with_temperature(0.7)
            .with_top_p(0.9),
            Persona::Analytical => CompletionRequest::new(
                ANALYTICAL_PERSONA_PROMPT,
                format!(
                    "{}Analysis type: {}\n\nRequest:\n{}",
                    context, analysis_type, query.text
                ),
            )
            .with_max_output_tokens(1500)
            .with_temperature(0.4)
            .with_top_p(0.85),
        }
    }
}
