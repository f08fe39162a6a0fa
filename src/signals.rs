//! Heuristic text mining over generated output.
//!
//! The pipeline only depends on [`SignalExtractor`], so the keyword scan
//! below can be replaced by a learned classifier without touching control
//! flow.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("static word pattern");
}

/// Word tokens of `text`, in order. Callers lowercase first when needed.
pub(crate) fn words(text: &str) -> impl Iterator<Item = &str> {
    WORD.find_iter(text).map(|m| m.as_str())
}

/// Longest line kept as an insight, concern or finding.
const MAX_SIGNAL_CHARS: usize = 200;

/// Lines shorter than this carry no usable signal.
const MIN_SIGNAL_CHARS: usize = 8;

const STRENGTH_MARKERS: &[&str] = &[
    "strength",
    "fortaleza",
    "strong",
    "sólid",
    "solid",
    "well",
    "adecuad",
    "appropriate",
    "correct",
    "acierto",
    "positiv",
    "valuable",
    "valios",
    "effective",
    "eficaz",
    "insight",
];

const CONCERN_MARKERS: &[&str] = &[
    "weakness",
    "debilidad",
    "missing",
    "falta",
    "lacks",
    "gap",
    "laguna",
    "risk",
    "riesgo",
    "concern",
    "preocupa",
    "limitation",
    "limitación",
    "insufficient",
    "insuficiente",
    "omit",
    "overlook",
    "unclear",
];

const FINDING_MARKERS: &[&str] = &[
    "recommend",
    "recomend",
    "recomi",
    "important",
    "importante",
    "key",
    "clave",
    "critical",
    "crítico",
    "must",
    "debe",
    "should",
    "risk",
    "riesgo",
    "obligatori",
    "required",
];

/// Positive and negative findings pulled from a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Lines carrying strength markers, in order of appearance.
    pub insights: Vec<String>,
    /// Lines carrying weakness or risk markers, in order of appearance.
    pub concerns: Vec<String>,
}

/// Classifier over generated text.
pub trait SignalExtractor: Send + Sync {
    /// Extract insights and concerns from `text`.
    fn extract(&self, text: &str) -> Signals;
}

/// Marker-keyword extractor. A line may count as both an insight and a
/// concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSignalExtractor;

impl SignalExtractor for KeywordSignalExtractor {
    fn extract(&self, text: &str) -> Signals {
        let mut signals = Signals::default();

        for line in candidate_lines(text) {
            let lower = line.to_lowercase();
            if contains_any(&lower, STRENGTH_MARKERS) {
                signals.insights.push(line.clone());
            }
            if contains_any(&lower, CONCERN_MARKERS) {
                signals.concerns.push(line);
            }
        }

        signals
    }
}

/// Extract up to `limit` "key finding" lines by marker keyword.
pub fn extract_key_findings(text: &str, limit: usize) -> Vec<String> {
    candidate_lines(text)
        .filter(|line| contains_any(&line.to_lowercase(), FINDING_MARKERS))
        .take(limit)
        .collect()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Non-trivial lines with list bullets and heading marks stripped,
/// truncated on a char boundary.
fn candidate_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(clean_line)
        .filter(|line| line.chars().count() >= MIN_SIGNAL_CHARS)
        .map(|line| line.chars().take(MAX_SIGNAL_CHARS).collect())
}

fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| {
            c == '-' || c == '*' || c == '•' || c == '#' || c.is_ascii_digit() || c == '.' || c == ')'
        })
        .trim()
}
