//! Request handling: rate limit, route, dispatch.
//!
//! [`AppState`] owns every mode handler and the shared rate limiter. The
//! transport layer builds one at startup and calls [`AppState::handle`] per
//! query.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::evaluation::{EvaluationHarness, QualityScorer};
use crate::modes::{
    HybridMode, HybridResult, ModeCore, PipelineResult, ReflectionMode, RouteTarget, Router,
    RoutingDecision, SimpleResult, StandardMode,
};
use crate::query::Query;
use crate::rate_limit::{InMemoryRateLimiter, RateLimiter};

/// Result of the path a query was routed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "result", rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// Single-pass persona answer.
    Standard(SimpleResult),
    /// Five-stage reflective answer.
    Reflective(PipelineResult),
    /// Analytical plus conversational answer.
    Hybrid(HybridResult),
}

impl ResponseOutcome {
    /// The answer text delivered to the caller.
    pub fn message(&self) -> &str {
        match self {
            ResponseOutcome::Standard(r) => &r.message,
            ResponseOutcome::Reflective(r) => &r.final_message,
            ResponseOutcome::Hybrid(r) => &r.message,
        }
    }

    /// Reported confidence.
    pub fn confidence(&self) -> f64 {
        match self {
            ResponseOutcome::Standard(r) => r.confidence,
            ResponseOutcome::Reflective(r) => r.confidence,
            ResponseOutcome::Hybrid(r) => r.confidence,
        }
    }

    /// Follow-ups offered with the answer.
    pub fn suggestions(&self) -> &[String] {
        match self {
            ResponseOutcome::Standard(r) => &r.recommendations,
            ResponseOutcome::Reflective(r) => &r.suggestions,
            ResponseOutcome::Hybrid(r) => &r.suggestions,
        }
    }

    /// Whether the answer came from a fallback path.
    pub fn is_degraded(&self) -> bool {
        match self {
            ResponseOutcome::Standard(r) => r.fallback,
            ResponseOutcome::Reflective(r) => r.is_fallback(),
            ResponseOutcome::Hybrid(r) => r.is_degraded(),
        }
    }
}

/// Routed answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    /// How the query was routed.
    pub decision: RoutingDecision,
    /// What the selected path returned.
    pub outcome: ResponseOutcome,
}

/// Application state shared across requests.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Keyword router.
    pub router: Router,
    /// Single-pass responder.
    pub standard_mode: StandardMode,
    /// P4 reflective pipeline.
    pub reflection_mode: ReflectionMode,
    /// Hybrid composition.
    pub hybrid_mode: HybridMode,
    /// Per-caller admission check.
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Create application state over a completion client, with an in-memory
    /// rate limiter.
    pub fn new(config: Config, client: Arc<dyn CompletionClient>) -> Self {
        info!(
            pipe = %config.pipes.completion,
            timeout_ms = config.request.timeout_ms,
            reflective_analysis = config.router.reflective_analysis,
            "AppState initializing"
        );

        let core = ModeCore::from_config(client, &config.request);
        let standard_mode = StandardMode::new(core.clone());
        let reflection_mode = ReflectionMode::new(core);
        let hybrid_mode = HybridMode::new(standard_mode.clone(), config.router.hybrid_excerpt_chars);
        let router = Router::new(config.router.clone());
        let rate_limiter = Arc::new(InMemoryRateLimiter::new(&config.rate_limit));

        Self {
            config,
            router,
            standard_mode,
            reflection_mode,
            hybrid_mode,
            rate_limiter,
        }
    }

    /// Replace the rate limiter.
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Build an evaluation harness over this state's modes.
    pub fn evaluation_harness(&self, scorer: QualityScorer) -> EvaluationHarness {
        EvaluationHarness::new(
            self.standard_mode.clone(),
            self.reflection_mode.clone(),
            scorer,
            self.config.evaluation.clone(),
        )
    }

    /// Admit, route and answer one query.
    ///
    /// The only error is [`AppError::RateLimited`]; completion failures are
    /// absorbed into degraded outcomes by the modes.
    pub async fn handle(&self, query: &Query) -> AppResult<ServiceResponse> {
        let identity = query.identity();
        if !self.rate_limiter.allow(&identity).await {
            warn!(identity = %identity, "Request rejected by rate limiter");
            return Err(AppError::RateLimited { identity });
        }

        let decision = self.router.route(query);
        let outcome = self.dispatch(decision.target, query).await;

        info!(
            session_id = %query.session_id,
            target = %decision.target,
            confidence = outcome.confidence(),
            degraded = outcome.is_degraded(),
            "Request handled"
        );

        Ok(ServiceResponse { decision, outcome })
    }

    /// Run the path named by `target`.
    pub async fn dispatch(&self, target: RouteTarget, query: &Query) -> ResponseOutcome {
        match target {
            RouteTarget::Standard { persona } => {
                ResponseOutcome::Standard(self.standard_mode.respond(persona, query).await)
            }
            RouteTarget::P4Reflective => {
                ResponseOutcome::Reflective(self.reflection_mode.reflect(query).await)
            }
            RouteTarget::Hybrid => ResponseOutcome::Hybrid(self.hybrid_mode.respond(query).await),
        }
    }
}
