//! Scenario fixtures for the evaluation harness.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::query::QueryContext;

/// Coarse difficulty tag of a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Single-topic question.
    Low,
    /// Several obligations involved.
    #[default]
    Medium,
    /// Cross-cutting or conflicting obligations.
    High,
}

/// A fixed test query with its expected-domain-term checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCase {
    /// Stable identifier.
    pub id: String,
    /// Query text.
    pub query: String,
    /// Context sent with the query.
    #[serde(default)]
    pub context: QueryContext,
    /// Terms a good answer should mention.
    #[serde(default)]
    pub expected_domain_terms: Vec<String>,
    /// Difficulty tag.
    #[serde(default)]
    pub complexity: Complexity,
}

fn case(
    id: &str,
    query: &str,
    context: QueryContext,
    terms: &[&str],
    complexity: Complexity,
) -> ScenarioCase {
    ScenarioCase {
        id: id.to_string(),
        query: query.to_string(),
        context,
        expected_domain_terms: terms.iter().map(|t| t.to_string()).collect(),
        complexity,
    }
}

/// Built-in scenario set.
pub fn default_scenarios() -> Vec<ScenarioCase> {
    vec![
        case(
            "data_protection_small_retailer",
            "Tenemos una tienda online con 15 empleados. ¿Qué debemos hacer para cumplir con el RGPD?",
            QueryContext::default()
                .with("company_size", "15")
                .with("industry", "retail"),
            &["rgpd", "consentimiento", "registro", "datos personales", "brecha"],
            Complexity::Medium,
        ),
        case(
            "supplier_gifts",
            "Un proveedor nos ofrece un viaje pagado a cambio de renovar el contrato. ¿Cómo deberíamos actuar?",
            QueryContext::default().with("role", "purchasing manager"),
            &["conflicto de interés", "soborno", "política", "regalos", "transparencia"],
            Complexity::Medium,
        ),
        case(
            "whistleblowing_channel",
            "Necesito implementar un canal de denuncias para una empresa de 60 personas. ¿Por dónde empiezo?",
            QueryContext::default().with("company_size", "60"),
            &["canal", "confidencialidad", "represalias", "plazo", "investigación"],
            Complexity::High,
        ),
        case(
            "harassment_protocol",
            "¿Qué debe incluir un protocolo de prevención del acoso laboral?",
            QueryContext::default().with("analysis_type", "policy_review"),
            &["protocolo", "acoso", "formación", "denuncia", "medidas"],
            Complexity::Low,
        ),
        case(
            "ai_hiring_tool",
            "Queremos usar una herramienta de inteligencia artificial para filtrar currículums. ¿Qué riesgos éticos y legales hay?",
            QueryContext::default()
                .with("industry", "staffing")
                .with("analysis_type", "risk_assessment"),
            &["sesgo", "discriminación", "transparencia", "supervisión humana", "datos personales"],
            Complexity::High,
        ),
    ]
}

/// Load scenarios from a JSON array of [`ScenarioCase`].
pub fn load_scenarios(path: impl AsRef<Path>) -> AppResult<Vec<ScenarioCase>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| AppError::Scenario {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let cases: Vec<ScenarioCase> =
        serde_json::from_str(&raw).map_err(|e| AppError::Scenario {
            message: format!("Invalid scenario file {}: {}", path.display(), e),
        })?;

    if let Some(blank) = cases.iter().find(|c| c.id.trim().is_empty()) {
        return Err(AppError::Scenario {
            message: format!("Scenario with empty id (query: {:?})", blank.query),
        });
    }

    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    #[test]
    fn test_default_scenarios_are_well_formed() {
        let cases = default_scenarios();
        assert_eq!(cases.len(), 5);

        let ids: HashSet<&str> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), cases.len());

        for c in &cases {
            assert!(!c.query.trim().is_empty());
            assert!(!c.expected_domain_terms.is_empty());
        }
    }

    #[test]
    fn test_load_scenarios_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "a", "query": "¿Qué es el compliance?", "expected_domain_terms": ["riesgo"], "complexity": "low"}},
                {{"id": "b", "query": "Evalúa riesgos", "context": {{"role": "CFO", "region": "EU"}}}}
            ]"#
        )
        .unwrap();

        let cases = load_scenarios(file.path()).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].complexity, Complexity::Low);
        assert_eq!(cases[1].complexity, Complexity::Medium);
        assert!(cases[1].expected_domain_terms.is_empty());
        assert_eq!(cases[1].context.role.as_deref(), Some("CFO"));
        assert!(cases[1].context.extra.contains_key("region"));
    }

    #[test]
    fn test_load_scenarios_missing_file() {
        let err = load_scenarios("/nonexistent/scenarios.json").unwrap_err();
        assert!(matches!(err, AppError::Scenario { .. }));
    }

    #[test]
    fn test_load_scenarios_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = load_scenarios(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid scenario file"));
    }

    #[test]
    fn test_load_scenarios_rejects_blank_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": " ", "query": "x"}}]"#).unwrap();
        assert!(load_scenarios(file.path()).is_err());
    }
}
