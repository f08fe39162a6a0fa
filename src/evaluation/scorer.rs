//! Heuristic quality scoring of agent answers.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{AgentTestResult, ScenarioCase};
use crate::signals::words;

lazy_static! {
    static ref NUMBERED_ITEM: Regex = Regex::new(r"(?m)^\s*\d+[.)]\s").expect("static numbered-item pattern");
}

const SECTION_WORDS: &[&str] = &[
    "summary",
    "resumen",
    "analysis",
    "análisis",
    "recommendation",
    "recomendacion",
    "recomendación",
    "conclusion",
    "conclusión",
    "next steps",
    "próximos pasos",
    "risks",
    "riesgos",
];

/// Verb stems, matched as word prefixes.
const ACTION_VERBS: &[&str] = &[
    "implement",
    "establish",
    "create",
    "develop",
    "review",
    "train",
    "document",
    "monitor",
    "assign",
    "define",
    "designate",
    "audit",
    "implementa",
    "establece",
    "crea",
    "desarrolla",
    "revisa",
    "forma",
    "documenta",
    "supervisa",
    "asigna",
    "designa",
    "audita",
];

const DIRECTIVE_PHRASES: &[&str] = &[
    "you should",
    "must",
    "we recommend",
    "it is essential",
    "make sure",
    "debe",
    "se recomienda",
    "recomendamos",
    "es fundamental",
    "asegúrate",
];

const URGENCY_PHRASES: &[&str] = &[
    "immediately",
    "within",
    "deadline",
    "urgent",
    "inmediat",
    "plazo",
    "urgente",
    "antes de",
    "days",
    "días",
    "weeks",
    "semanas",
];

/// Weights and caps behind [`QualityScorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Quality: normalized length.
    pub quality_length: f64,
    /// Quality: domain-term coverage.
    pub quality_coverage: f64,
    /// Quality: structural-marker density.
    pub quality_structure: f64,
    /// Quality: reported confidence.
    pub quality_confidence: f64,
    /// Completeness: domain-term coverage.
    pub completeness_coverage: f64,
    /// Completeness: suggestion count.
    pub completeness_suggestions: f64,
    /// Completeness: metadata richness.
    pub completeness_metadata: f64,
    /// Practicality: action verbs.
    pub practicality_verbs: f64,
    /// Practicality: directive phrases.
    pub practicality_directives: f64,
    /// Practicality: urgency and timeline phrases.
    pub practicality_urgency: f64,
    /// Word count at which length saturates.
    pub length_cap_words: usize,
    /// Structural markers at which structure saturates.
    pub structure_cap: usize,
    /// Suggestions at which the count saturates.
    pub suggestions_cap: usize,
    /// Action-verb hits at which the count saturates.
    pub verbs_cap: usize,
    /// Directive hits at which the count saturates.
    pub directives_cap: usize,
    /// Urgency hits at which the count saturates.
    pub urgency_cap: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality_length: 0.25,
            quality_coverage: 0.35,
            quality_structure: 0.25,
            quality_confidence: 0.15,
            completeness_coverage: 0.6,
            completeness_suggestions: 0.2,
            completeness_metadata: 0.2,
            practicality_verbs: 0.4,
            practicality_directives: 0.4,
            practicality_urgency: 0.2,
            length_cap_words: 200,
            structure_cap: 5,
            suggestions_cap: 4,
            verbs_cap: 8,
            directives_cap: 5,
            urgency_cap: 3,
        }
    }
}

/// The three per-answer scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    /// Length, coverage, structure and confidence.
    pub quality: f64,
    /// Coverage, suggestions and metadata richness.
    pub completeness: f64,
    /// Actionable language.
    pub practicality: f64,
}

impl QualityScores {
    /// Mean of the three scores.
    pub fn combined(&self) -> f64 {
        (self.quality + self.completeness + self.practicality) / 3.0
    }
}

/// Pure scoring over an answer and its scenario.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: ScoringWeights,
}

impl QualityScorer {
    /// Create a scorer with the given weights.
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Get the weights in use.
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score `result` against `scenario`. Error-marker answers score zero.
    pub fn score(&self, result: &AgentTestResult, scenario: &ScenarioCase) -> QualityScores {
        if result.is_error() {
            return QualityScores::default();
        }

        let w = &self.weights;
        let text = result.response.to_lowercase();
        let coverage = domain_coverage(&text, &scenario.expected_domain_terms);

        let words = result.response.split_whitespace().count();
        let structure = NUMBERED_ITEM.find_iter(&result.response).count()
            + count_hits(&text, SECTION_WORDS);

        let quality = ratio(words, w.length_cap_words) * w.quality_length
            + coverage * w.quality_coverage
            + ratio(structure, w.structure_cap) * w.quality_structure
            + result.confidence.clamp(0.0, 1.0) * w.quality_confidence;

        let completeness = coverage * w.completeness_coverage
            + ratio(result.suggestions.len(), w.suggestions_cap) * w.completeness_suggestions
            + metadata_richness(result) * w.completeness_metadata;

        let practicality = ratio(count_stem_words(&text, ACTION_VERBS), w.verbs_cap)
            * w.practicality_verbs
            + ratio(count_hits(&text, DIRECTIVE_PHRASES), w.directives_cap)
                * w.practicality_directives
            + ratio(count_hits(&text, URGENCY_PHRASES), w.urgency_cap) * w.practicality_urgency;

        QualityScores {
            quality: quality.clamp(0.0, 1.0),
            completeness: completeness.clamp(0.0, 1.0),
            practicality: practicality.clamp(0.0, 1.0),
        }
    }
}

/// Fraction of `terms` found in lowercased `text`. No terms means full coverage.
pub fn domain_coverage(text: &str, terms: &[String]) -> f64 {
    if terms.is_empty() {
        return 1.0;
    }
    let found = terms
        .iter()
        .filter(|t| text.contains(&t.to_lowercase()))
        .count();
    found as f64 / terms.len() as f64
}

fn count_hits(text: &str, phrases: &[&str]) -> usize {
    phrases.iter().map(|p| text.matches(p).count()).sum()
}

/// Words starting with any of `stems`; each word counts once.
fn count_stem_words(text: &str, stems: &[&str]) -> usize {
    words(text)
        .filter(|word| stems.iter().any(|stem| word.starts_with(stem)))
        .count()
}

fn ratio(count: usize, cap: usize) -> f64 {
    if cap == 0 {
        return 0.0;
    }
    (count as f64 / cap as f64).min(1.0)
}

/// Reflection structure beats a flat metadata map.
fn metadata_richness(result: &AgentTestResult) -> f64 {
    match result.reflection_steps {
        Some(steps) if steps > 0 => 1.0,
        _ if !result.metadata.is_empty() => 0.5,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Complexity;
    use crate::query::QueryContext;

    fn scenario(terms: &[&str]) -> ScenarioCase {
        ScenarioCase {
            id: "gdpr".to_string(),
            query: "¿Qué necesito para cumplir el RGPD?".to_string(),
            context: QueryContext::default(),
            expected_domain_terms: terms.iter().map(|t| t.to_string()).collect(),
            complexity: Complexity::Medium,
        }
    }

    fn answer(text: &str) -> AgentTestResult {
        AgentTestResult {
            response: text.to_string(),
            confidence: 0.9,
            processing_time_ms: 10,
            suggestions: vec!["a".into(), "b".into()],
            metadata: serde_json::Map::new(),
            reflection_steps: None,
        }
    }

    const RICH: &str = "\
Resumen: la empresa trata datos personales.
1. Designa un delegado de protección de datos antes de 30 días.
2. Implementa un registro de actividades; se recomienda revisarlo cada año.
3. Debe formar a la plantilla de forma inmediata.
Conclusión: el RGPD exige consentimiento y medidas de seguridad.";

    #[test]
    fn test_error_marker_scores_zero() {
        let scores = QualityScorer::default().score(
            &AgentTestResult::failed("timeout"),
            &scenario(&["rgpd"]),
        );
        assert_eq!(scores, QualityScores::default());
        assert_eq!(scores.combined(), 0.0);
    }

    #[test]
    fn test_scores_in_unit_range() {
        let scorer = QualityScorer::default();
        let mut long = answer(&RICH.repeat(40));
        long.suggestions = vec!["x".into(); 10];
        long.reflection_steps = Some(5);
        long.confidence = 3.0;

        for result in [answer(RICH), answer(""), long] {
            let s = scorer.score(&result, &scenario(&["rgpd", "consentimiento"]));
            for v in [s.quality, s.completeness, s.practicality] {
                assert!((0.0..=1.0).contains(&v), "score {} out of range", v);
            }
        }
    }

    #[test]
    fn test_score_is_idempotent() {
        let scorer = QualityScorer::default();
        let result = answer(RICH);
        let case = scenario(&["rgpd", "delegado", "brecha"]);
        assert_eq!(scorer.score(&result, &case), scorer.score(&result, &case));
    }

    #[test]
    fn test_coverage_drives_completeness() {
        let scorer = QualityScorer::default();
        let result = answer(RICH);
        let full = scorer.score(&result, &scenario(&["rgpd", "delegado"]));
        let half = scorer.score(&result, &scenario(&["rgpd", "brecha"]));
        assert!(full.completeness > half.completeness);
        assert!((full.completeness - half.completeness - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_reflection_metadata_scores_higher() {
        let scorer = QualityScorer::default();
        let case = scenario(&[]);

        let plain = answer(RICH);
        let mut flat = answer(RICH);
        flat.metadata.insert("persona".into(), "analytical".into());
        let mut reflective = answer(RICH);
        reflective.reflection_steps = Some(5);

        let plain = scorer.score(&plain, &case).completeness;
        let flat = scorer.score(&flat, &case).completeness;
        let reflective = scorer.score(&reflective, &case).completeness;
        assert!(reflective > flat && flat > plain);
    }

    #[test]
    fn test_practicality_counts_actionable_language() {
        let scorer = QualityScorer::default();
        let case = scenario(&[]);
        let vague = scorer.score(&answer("Es un tema interesante."), &case);
        let concrete = scorer.score(&answer(RICH), &case);
        assert_eq!(vague.practicality, 0.0);
        assert!(concrete.practicality > 0.5);
    }

    #[test]
    fn test_structure_counts_numbered_items() {
        assert_eq!(NUMBERED_ITEM.find_iter(RICH).count(), 3);
        assert_eq!(NUMBERED_ITEM.find_iter("no list here 1. inline").count(), 0);
    }

    #[test]
    fn test_action_verbs_count_once_per_word() {
        assert_eq!(count_stem_words("create", ACTION_VERBS), 1);
        assert_eq!(count_stem_words("designate", ACTION_VERBS), 1);
        assert_eq!(count_stem_words("implementation", ACTION_VERBS), 1);
        assert_eq!(count_stem_words("documentation", ACTION_VERBS), 1);
        assert_eq!(count_stem_words("information", ACTION_VERBS), 0);
        assert_eq!(
            count_stem_words("information constraint increase", ACTION_VERBS),
            0
        );
        assert_eq!(count_stem_words("designa y forma al equipo", ACTION_VERBS), 2);
    }

    #[test]
    fn test_domain_coverage() {
        let terms = vec!["RGPD".to_string(), "brecha".to_string()];
        assert_eq!(domain_coverage("el rgpd aplica", &terms), 0.5);
        assert_eq!(domain_coverage("nada", &[]), 1.0);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoringWeights {
            quality_length: 0.0,
            quality_coverage: 1.0,
            quality_structure: 0.0,
            quality_confidence: 0.0,
            ..ScoringWeights::default()
        };
        let scores = QualityScorer::new(weights).score(&answer("rgpd"), &scenario(&["rgpd"]));
        assert_eq!(scores.quality, 1.0);
    }

    #[test]
    fn test_weights_deserialize_with_defaults() {
        let weights: ScoringWeights =
            serde_json::from_str(r#"{"quality_coverage": 0.5}"#).unwrap();
        assert_eq!(weights.quality_coverage, 0.5);
        assert_eq!(weights.length_cap_words, 200);
    }
}
