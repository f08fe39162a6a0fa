//! Request router - picks the response path for each query.
//!
//! Routing is a pure function of the query: an explicit override in the
//! context wins, otherwise keyword counts and message length decide.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Persona;
use crate::config::RouterConfig;
use crate::query::Query;
use crate::signals::words;

const CONVERSATIONAL_TERMS: &[&str] = &[
    "hola", "hello", "hi", "hey", "buenas", "gracias", "thanks", "thank", "ayuda", "ayudar",
    "ayúdame", "ayudame", "help", "necesito", "need", "pregunta", "question", "duda", "dudas",
    "puedes", "podrías", "podrias", "could", "please", "favor", "explica", "explain", "consejo",
    "advice",
];

const ANALYTICAL_TERMS: &[&str] = &[
    "análisis", "analisis", "analysis", "riesgo", "riesgos", "risk", "risks", "normativa",
    "regulation", "regulations", "cumplimiento", "compliance", "auditoría", "auditoria", "audit",
    "evaluación", "evaluacion", "assessment", "política", "politica", "policy", "control",
    "controles", "controls", "matriz", "matrix", "procedimiento", "procedure", "marco",
    "framework", "gdpr", "rgpd", "sox", "iso", "protocolo", "protocol", "sanciones", "sanctions",
];

/// Stems of strong analytical action verbs, matched as token prefixes.
/// "analysis" is a noun and must not match.
const ACTION_STEMS: &[&str] = &[
    "implement", "program", "analiz", "analyz", "analyse", "report", "informe",
];

/// Where a query is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum RouteTarget {
    /// Single-pass responder with the given persona.
    Standard {
        /// Persona to answer with.
        persona: Persona,
    },
    /// Five-stage reflective pipeline.
    #[serde(rename = "p4reflective")]
    P4Reflective,
    /// Analytical then conversational composition.
    Hybrid,
}

impl RouteTarget {
    /// Parse a context override value. Unknown values yield `None`.
    pub fn from_override(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "standard" | "conversational" => Some(RouteTarget::Standard {
                persona: Persona::Conversational,
            }),
            "analytical" => Some(RouteTarget::Standard {
                persona: Persona::Analytical,
            }),
            "p4" | "p4reflective" | "p4_reflective" | "reflective" => Some(RouteTarget::P4Reflective),
            "hybrid" => Some(RouteTarget::Hybrid),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTarget::Standard {
                persona: Persona::Conversational,
            } => "standard:conversational",
            RouteTarget::Standard {
                persona: Persona::Analytical,
            } => "standard:analytical",
            RouteTarget::P4Reflective => "p4reflective",
            RouteTarget::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRule {
    /// Explicit context override.
    Override,
    /// Short message with a conversational cue.
    ShortConversational,
    /// Strong analytical action verb.
    ActionVerb,
    /// More analytical than conversational terms.
    AnalyticalMajority,
    /// More conversational than analytical terms.
    ConversationalMajority,
    /// Tie on a long message.
    LongTie,
    /// Tie on a short message.
    ShortTie,
}

impl RoutingRule {
    /// Short human-readable reason, for logs.
    pub fn rationale(&self) -> &'static str {
        match self {
            RoutingRule::Override => "explicit override in context",
            RoutingRule::ShortConversational => "short message with a conversational cue",
            RoutingRule::ActionVerb => "analytical action verb present",
            RoutingRule::AnalyticalMajority => "more analytical than conversational terms",
            RoutingRule::ConversationalMajority => "more conversational than analytical terms",
            RoutingRule::LongTie => "ambiguous long message",
            RoutingRule::ShortTie => "ambiguous short message",
        }
    }
}

/// Outcome of routing one query. Recomputed per request, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected path.
    #[serde(flatten)]
    pub target: RouteTarget,
    /// Rule that fired.
    pub rule: RoutingRule,
    /// Number of tokens in the message.
    pub word_count: usize,
    /// Conversational keyword matches.
    pub conversational_matches: usize,
    /// Analytical keyword matches.
    pub analytical_matches: usize,
}

/// Keyword router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    config: RouterConfig,
}

impl Router {
    /// Create a router with the given thresholds
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Route a query. Always returns a decision.
    pub fn route(&self, query: &Query) -> RoutingDecision {
        let tokens = tokenize(&query.text);
        let word_count = tokens.len();
        let conversational_matches = count_matches(&tokens, CONVERSATIONAL_TERMS);
        let analytical_matches = count_matches(&tokens, ANALYTICAL_TERMS);

        let decide = |target: RouteTarget, rule: RoutingRule| RoutingDecision {
            target,
            rule,
            word_count,
            conversational_matches,
            analytical_matches,
        };

        if let Some(value) = query.context.route_override.as_deref() {
            match RouteTarget::from_override(value) {
                Some(target) => {
                    debug!(session_id = %query.session_id, target = %target, "Routing override honored");
                    return decide(target, RoutingRule::Override);
                }
                None => warn!(
                    session_id = %query.session_id,
                    value = %value,
                    "Ignoring unrecognized routing override"
                ),
            }
        }

        let conversational = RouteTarget::Standard {
            persona: Persona::Conversational,
        };
        let analytical = if self.config.reflective_analysis {
            RouteTarget::P4Reflective
        } else {
            RouteTarget::Standard {
                persona: Persona::Analytical,
            }
        };

        let decision = if word_count < self.config.short_message_words && conversational_matches > 0
        {
            decide(conversational, RoutingRule::ShortConversational)
        } else if tokens.iter().any(|t| is_action_verb(t)) {
            decide(analytical, RoutingRule::ActionVerb)
        } else if analytical_matches > conversational_matches {
            decide(analytical, RoutingRule::AnalyticalMajority)
        } else if conversational_matches > analytical_matches {
            decide(conversational, RoutingRule::ConversationalMajority)
        } else if word_count > self.config.hybrid_min_words {
            decide(RouteTarget::Hybrid, RoutingRule::LongTie)
        } else {
            decide(conversational, RoutingRule::ShortTie)
        };

        debug!(
            session_id = %query.session_id,
            target = %decision.target,
            rule = ?decision.rule,
            rationale = decision.rule.rationale(),
            words = word_count,
            conversational = conversational_matches,
            analytical = analytical_matches,
            "Query routed"
        );

        decision
    }
}

fn tokenize(text: &str) -> Vec<String> {
    words(&text.to_lowercase()).map(str::to_string).collect()
}

fn count_matches(tokens: &[String], terms: &[&str]) -> usize {
    tokens
        .iter()
        .filter(|t| terms.contains(&t.as_str()))
        .count()
}

fn is_action_verb(token: &str) -> bool {
    ACTION_STEMS.iter().any(|stem| token.starts_with(stem))
}
