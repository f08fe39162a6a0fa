//! P4 reflective pipeline - critique, validate, refine, synthesize.
//!
//! This module runs a fixed five-stage reflection per query:
//! - Initial response to the raw query
//! - Self-critique along five fixed dimensions
//! - Validation against five ethical/analytical frameworks
//! - Refinement that supersedes the initial answer
//! - Final synthesis with an insights summary
//!
//! Stages are strictly sequential: each prompt embeds the text produced by
//! the stages before it. A failure at any stage aborts the run and returns
//! the single-step fallback result; partially reflected output is never
//! returned.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{FailureInfo, ModeCore};
use crate::completion::CompletionRequest;
use crate::prompts::{
    P4_FALLBACK_ADVISORY, P4_FINAL_SYNTHESIS_PROMPT, P4_FRAMEWORK_VALIDATION_PROMPT,
    P4_INITIAL_RESPONSE_PROMPT, P4_REFINEMENT_PROMPT, P4_SELF_CRITIQUE_PROMPT,
};
use crate::query::Query;
use crate::signals::{KeywordSignalExtractor, SignalExtractor};

/// Insights carried into the synthesis prompt.
pub const MAX_SYNTHESIS_INSIGHTS: usize = 10;

/// Concerns carried into the synthesis prompt.
pub const MAX_SYNTHESIS_CONCERNS: usize = 8;

/// Follow-up questions returned per run.
pub const MAX_SUGGESTIONS: usize = 4;

/// Confidence reported by the fallback path.
pub const FALLBACK_CONFIDENCE: f64 = 0.75;

const BASELINE_SUGGESTIONS: &[&str] = &[
    "How should these recommendations be prioritized for your company?",
    "What resources would you need to implement this plan?",
    "How will you measure whether the measures are working?",
];

/// (trigger terms, follow-up question), checked in order.
const TRIGGERED_SUGGESTIONS: &[(&[&str], &str)] = &[
    (
        &["stakeholder", "partes interesadas", "grupos de interés"],
        "Which stakeholders should be involved first, and how?",
    ),
    (
        &["consequence", "consecuencia"],
        "Which consequences would you monitor after implementation?",
    ),
    (
        &["framework", "marco"],
        "Would you like to go deeper into one of the ethical frameworks applied?",
    ),
];

/// One of the fixed pipeline stages, plus the synthetic fallback stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionStage {
    /// First-pass answer.
    InitialResponse,
    /// Critique of the first pass.
    SelfCritique,
    /// Validation across frameworks.
    MultiFrameworkValidation,
    /// Rewritten answer.
    IterativeRefinement,
    /// Terminal answer.
    FinalSynthesis,
    /// Synthetic step produced when the pipeline aborts.
    Fallback,
}

/// Sampling and confidence settings for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageProfile {
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
    /// Output length cap.
    pub max_output_tokens: u32,
    /// Confidence recorded on the step.
    pub confidence: f64,
}

impl ReflectionStage {
    /// The five pipeline stages in execution order.
    pub const PIPELINE: [ReflectionStage; 5] = [
        ReflectionStage::InitialResponse,
        ReflectionStage::SelfCritique,
        ReflectionStage::MultiFrameworkValidation,
        ReflectionStage::IterativeRefinement,
        ReflectionStage::FinalSynthesis,
    ];

    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectionStage::InitialResponse => "initial_response",
            ReflectionStage::SelfCritique => "self_critique",
            ReflectionStage::MultiFrameworkValidation => "multi_framework_validation",
            ReflectionStage::IterativeRefinement => "iterative_refinement",
            ReflectionStage::FinalSynthesis => "final_synthesis",
            ReflectionStage::Fallback => "fallback",
        }
    }

    /// Sampling and confidence for the stage. Critique and synthesis run
    /// cooler than the initial pass.
    pub fn profile(&self) -> StageProfile {
        let (temperature, top_p, max_output_tokens, confidence) = match self {
            ReflectionStage::InitialResponse => (0.7, 0.9, 1024, 0.6),
            ReflectionStage::SelfCritique => (0.3, 0.8, 1024, 0.8),
            ReflectionStage::MultiFrameworkValidation => (0.4, 0.85, 1200, 0.85),
            ReflectionStage::IterativeRefinement => (0.5, 0.9, 1500, 0.9),
            ReflectionStage::FinalSynthesis => (0.3, 0.8, 1500, 0.95),
            ReflectionStage::Fallback => (0.0, 0.0, 0, FALLBACK_CONFIDENCE),
        };
        StageProfile {
            temperature,
            top_p,
            max_output_tokens,
            confidence,
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            ReflectionStage::InitialResponse => P4_INITIAL_RESPONSE_PROMPT,
            ReflectionStage::SelfCritique => P4_SELF_CRITIQUE_PROMPT,
            ReflectionStage::MultiFrameworkValidation => P4_FRAMEWORK_VALIDATION_PROMPT,
            ReflectionStage::IterativeRefinement => P4_REFINEMENT_PROMPT,
            ReflectionStage::FinalSynthesis => P4_FINAL_SYNTHESIS_PROMPT,
            ReflectionStage::Fallback => "",
        }
    }
}

impl std::fmt::Display for ReflectionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dimensions the self-critique stage evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CritiqueDimension {
    Completeness,
    StakeholderCoverage,
    UnforeseenConsequences,
    FrameworkDepth,
    PracticalApplicability,
}

impl CritiqueDimension {
    /// All dimensions in prompt order.
    pub const ALL: [CritiqueDimension; 5] = [
        CritiqueDimension::Completeness,
        CritiqueDimension::StakeholderCoverage,
        CritiqueDimension::UnforeseenConsequences,
        CritiqueDimension::FrameworkDepth,
        CritiqueDimension::PracticalApplicability,
    ];

    /// Prompt line for the dimension.
    pub fn prompt_line(&self) -> &'static str {
        match self {
            CritiqueDimension::Completeness => {
                "Completeness: does it answer every part of the question?"
            }
            CritiqueDimension::StakeholderCoverage => {
                "Stakeholder coverage: are employees, customers, regulators and owners considered?"
            }
            CritiqueDimension::UnforeseenConsequences => {
                "Unforeseen consequences: what side effects or second-order risks are missed?"
            }
            CritiqueDimension::FrameworkDepth => {
                "Framework depth: is the ethical and regulatory reasoning explicit and sound?"
            }
            CritiqueDimension::PracticalApplicability => {
                "Practical applicability: can a small company act on it tomorrow?"
            }
        }
    }
}

/// Frameworks used by the validation stage. Prompt templating only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EthicalFramework {
    Utilitarian,
    Deontological,
    VirtueEthics,
    StakeholderTheory,
    RiskBasedCompliance,
}

impl EthicalFramework {
    /// All frameworks in prompt order.
    pub const ALL: [EthicalFramework; 5] = [
        EthicalFramework::Utilitarian,
        EthicalFramework::Deontological,
        EthicalFramework::VirtueEthics,
        EthicalFramework::StakeholderTheory,
        EthicalFramework::RiskBasedCompliance,
    ];

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            EthicalFramework::Utilitarian => "Utilitarian ethics",
            EthicalFramework::Deontological => "Deontological ethics",
            EthicalFramework::VirtueEthics => "Virtue ethics",
            EthicalFramework::StakeholderTheory => "Stakeholder theory",
            EthicalFramework::RiskBasedCompliance => "Risk-based compliance",
        }
    }

    /// What the framework asks of the answer.
    pub fn focus(&self) -> &'static str {
        match self {
            EthicalFramework::Utilitarian => "maximize overall wellbeing and minimize harm",
            EthicalFramework::Deontological => "respect duties, rights and legal obligations",
            EthicalFramework::VirtueEthics => "act as an honest, fair and prudent organization would",
            EthicalFramework::StakeholderTheory => "balance the interests of everyone affected",
            EthicalFramework::RiskBasedCompliance => {
                "allocate controls in proportion to likelihood and impact"
            }
        }
    }
}

/// Output of one stage. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionStep {
    /// Stage that produced the step.
    pub name: ReflectionStage,
    /// Generated text.
    pub content: String,
    /// Stage confidence (0.0-1.0), fixed per stage.
    pub confidence: f64,
    /// Positive findings extracted from `content`.
    pub insights: Vec<String>,
    /// Negative findings extracted from `content`.
    pub concerns: Vec<String>,
    /// Wall time of the stage.
    pub duration_ms: u64,
}

/// Aggregate view over a run's steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsSummary {
    /// Number of steps in the result.
    pub step_count: usize,
    /// Step confidences in order.
    pub confidence_trajectory: Vec<f64>,
    /// Insights across all steps.
    pub total_insights: usize,
    /// Concerns across all steps.
    pub total_concerns: usize,
    /// Insights handed to the synthesis stage.
    pub key_insights: Vec<String>,
    /// Concerns handed to the synthesis stage.
    pub key_concerns: Vec<String>,
    /// Frameworks the validation stage applied.
    pub frameworks_applied: Vec<String>,
    /// Why the run degraded, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureInfo>,
}

/// Terminal output of one reflective run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Correlation ID copied from the query.
    pub session_id: String,
    /// The answer delivered to the caller.
    pub final_message: String,
    /// Process-completion confidence, not measured accuracy.
    pub confidence: f64,
    /// Up to four follow-up questions.
    pub suggestions: Vec<String>,
    /// Five steps in stage order, or one fallback step.
    pub reflection_steps: Vec<ReflectionStep>,
    /// Wall time of the whole run.
    pub processing_duration_ms: u64,
    /// Aggregate insight/concern view.
    pub insights_summary: InsightsSummary,
}

impl PipelineResult {
    /// Whether the fallback path produced this result.
    pub fn is_fallback(&self) -> bool {
        self.insights_summary.failure.is_some()
    }
}

/// Reflective pipeline handler.
#[derive(Clone)]
pub struct ReflectionMode {
    /// Core infrastructure (completion client and timeout).
    core: ModeCore,
    /// Insight/concern classifier applied to each stage's output.
    extractor: Arc<dyn SignalExtractor>,
}

impl ReflectionMode {
    /// Create a pipeline using the keyword signal extractor
    pub fn new(core: ModeCore) -> Self {
        Self::with_extractor(core, Arc::new(KeywordSignalExtractor))
    }

    /// Create a pipeline with a custom signal extractor
    pub fn with_extractor(core: ModeCore, extractor: Arc<dyn SignalExtractor>) -> Self {
        Self { core, extractor }
    }

    /// Run the five stages for `query`. Never fails: any stage failure
    /// yields the fallback result.
    pub async fn reflect(&self, query: &Query) -> PipelineResult {
        let start = Instant::now();
        debug!(session_id = %query.session_id, "Starting reflective pipeline");

        let steps = match self.run_stages(query).await {
            Ok(steps) => steps,
            Err(failure) => {
                warn!(
                    session_id = %query.session_id,
                    stage = %failure.stage,
                    kind = %failure.kind,
                    reason = %failure.message,
                    "Reflective pipeline aborted, returning fallback"
                );
                return Self::fallback(query, failure, start);
            }
        };

        let suggestions = generate_suggestions(&steps);
        let insights_summary = summarize(&steps, None);
        let (final_message, confidence) = steps
            .last()
            .map(|s| (s.content.clone(), s.confidence))
            .unwrap_or_default();
        let processing_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            session_id = %query.session_id,
            steps = steps.len(),
            insights = insights_summary.total_insights,
            concerns = insights_summary.total_concerns,
            latency_ms = processing_duration_ms,
            "Reflective pipeline completed"
        );

        PipelineResult {
            session_id: query.session_id.clone(),
            final_message,
            confidence,
            suggestions,
            reflection_steps: steps,
            processing_duration_ms,
            insights_summary,
        }
    }

    async fn run_stages(&self, query: &Query) -> Result<Vec<ReflectionStep>, FailureInfo> {
        if query.is_blank() {
            return Err(FailureInfo::blank_query(
                ReflectionStage::InitialResponse.as_str(),
            ));
        }

        let mut steps: Vec<ReflectionStep> = Vec::with_capacity(ReflectionStage::PIPELINE.len());

        for stage in ReflectionStage::PIPELINE {
            let user_prompt = build_stage_prompt(stage, query, &steps);
            let step = self.run_stage(stage, user_prompt, query).await?;
            steps.push(step);
        }

        Ok(steps)
    }

    async fn run_stage(
        &self,
        stage: ReflectionStage,
        user_prompt: String,
        query: &Query,
    ) -> Result<ReflectionStep, FailureInfo> {
        let start = Instant::now();
        let profile = stage.profile();

        let request = CompletionRequest::new(stage.system_prompt(), user_prompt)
            .with_max_output_tokens(profile.max_output_tokens)
            .with_temperature(profile.temperature)
            .with_top_p(profile.top_p);

        let content = self
            .core
            .generate(&request, stage.as_str())
            .await
            .map_err(|e| FailureInfo::from_error(stage.as_str(), &e))?;

        let signals = self.extractor.extract(&content);
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            session_id = %query.session_id,
            stage = %stage,
            insights = signals.insights.len(),
            concerns = signals.concerns.len(),
            latency_ms = duration_ms,
            "Reflection stage completed"
        );

        Ok(ReflectionStep {
            name: stage,
            content,
            confidence: profile.confidence,
            insights: signals.insights,
            concerns: signals.concerns,
            duration_ms,
        })
    }

    fn fallback(query: &Query, failure: FailureInfo, start: Instant) -> PipelineResult {
        let step = ReflectionStep {
            name: ReflectionStage::Fallback,
            content: P4_FALLBACK_ADVISORY.to_string(),
            confidence: FALLBACK_CONFIDENCE,
            insights: Vec::new(),
            concerns: Vec::new(),
            duration_ms: 0,
        };
        let steps = vec![step];
        let insights_summary = summarize(&steps, Some(failure));

        PipelineResult {
            session_id: query.session_id.clone(),
            final_message: P4_FALLBACK_ADVISORY.to_string(),
            confidence: FALLBACK_CONFIDENCE,
            suggestions: BASELINE_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            reflection_steps: steps,
            processing_duration_ms: start.elapsed().as_millis() as u64,
            insights_summary,
        }
    }
}

fn content_of(steps: &[ReflectionStep], stage: ReflectionStage) -> &str {
    steps
        .iter()
        .find(|s| s.name == stage)
        .map(|s| s.content.as_str())
        .unwrap_or_default()
}

/// Insights and concerns from the stages preceding synthesis, capped.
fn synthesis_inputs(steps: &[ReflectionStep]) -> (Vec<String>, Vec<String>) {
    let before_synthesis = || {
        steps
            .iter()
            .filter(|s| s.name != ReflectionStage::FinalSynthesis && s.name != ReflectionStage::Fallback)
    };
    let insights = before_synthesis()
        .flat_map(|s| s.insights.iter().cloned())
        .take(MAX_SYNTHESIS_INSIGHTS)
        .collect();
    let concerns = before_synthesis()
        .flat_map(|s| s.concerns.iter().cloned())
        .take(MAX_SYNTHESIS_CONCERNS)
        .collect();
    (insights, concerns)
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        "- (none)".to_string()
    } else {
        items
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Build the user prompt for `stage` from the query and prior steps.
fn build_stage_prompt(stage: ReflectionStage, query: &Query, steps: &[ReflectionStep]) -> String {
    let question = format!("{}Question:\n{}", query.context.prompt_block(), query.text);
    let initial = content_of(steps, ReflectionStage::InitialResponse);
    let critique = content_of(steps, ReflectionStage::SelfCritique);

    match stage {
        ReflectionStage::InitialResponse => question,
        ReflectionStage::SelfCritique => {
            let dimensions: Vec<&str> = CritiqueDimension::ALL
                .iter()
                .map(|d| d.prompt_line())
                .collect();
            format!(
                "{}\n\nAnswer to critique:\n{}\n\nCritique dimensions:\n- {}",
                question,
                initial,
                dimensions.join("\n- ")
            )
        }
        ReflectionStage::MultiFrameworkValidation => {
            let frameworks: Vec<String> = EthicalFramework::ALL
                .iter()
                .map(|f| format!("{}: {}", f.label(), f.focus()))
                .collect();
            format!(
                "{}\n\nInitial answer:\n{}\n\nCritique:\n{}\n\nFrameworks:\n- {}",
                question,
                initial,
                critique,
                frameworks.join("\n- ")
            )
        }
        ReflectionStage::IterativeRefinement => format!(
            "{}\n\nInitial answer (to be superseded):\n{}\n\nCritique:\n{}\n\nFramework validation:\n{}",
            question,
            initial,
            critique,
            content_of(steps, ReflectionStage::MultiFrameworkValidation)
        ),
        ReflectionStage::FinalSynthesis => {
            let (insights, concerns) = synthesis_inputs(steps);
            format!(
                "{}\n\nRefined answer:\n{}\n\nKey insights:\n{}\n\nOpen concerns:\n{}",
                question,
                content_of(steps, ReflectionStage::IterativeRefinement),
                bullet_list(&insights),
                bullet_list(&concerns)
            )
        }
        ReflectionStage::Fallback => String::new(),
    }
}

/// Baseline follow-ups plus ones triggered by domain terms in any stage.
fn generate_suggestions(steps: &[ReflectionStep]) -> Vec<String> {
    let corpus = steps
        .iter()
        .map(|s| s.content.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");

    let triggered = TRIGGERED_SUGGESTIONS
        .iter()
        .filter(|(terms, _)| terms.iter().any(|t| corpus.contains(t)))
        .map(|(_, question)| *question);

    BASELINE_SUGGESTIONS
        .iter()
        .copied()
        .chain(triggered)
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

fn summarize(steps: &[ReflectionStep], failure: Option<FailureInfo>) -> InsightsSummary {
    let (key_insights, key_concerns) = synthesis_inputs(steps);
    let validated = steps
        .iter()
        .any(|s| s.name == ReflectionStage::MultiFrameworkValidation);

    InsightsSummary {
        step_count: steps.len(),
        confidence_trajectory: steps.iter().map(|s| s.confidence).collect(),
        total_insights: steps.iter().map(|s| s.insights.len()).sum(),
        total_concerns: steps.iter().map(|s| s.concerns.len()).sum(),
        key_insights,
        key_concerns,
        frameworks_applied: if validated {
            EthicalFramework::ALL
                .iter()
                .map(|f| f.label().to_string())
                .collect()
        } else {
            Vec::new()
        },
        failure,
    }
}
