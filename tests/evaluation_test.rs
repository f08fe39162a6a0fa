//! Evaluation harness tests over a mocked Langbase pipe

use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use compliance_reasoning::completion::LangbaseClient;
use compliance_reasoning::config::{
    Config, EvaluationConfig, LangbaseConfig, LogFormat, LoggingConfig, PipeConfig,
    RateLimitConfig, RequestConfig, RouterConfig,
};
use compliance_reasoning::evaluation::{load_scenarios, QualityScorer, Winner};
use compliance_reasoning::AppState;

const ANSWER: &str = "\
Resumen: el canal de denuncias debe garantizar confidencialidad.
1. Designa un responsable antes de 30 días.
2. Implementa un procedimiento de investigación.
3. Se recomienda formar a la plantilla.";

fn state_for(server: &MockServer) -> AppState {
    let config = Config {
        langbase: LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: server.uri(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig {
            timeout_ms: 5000,
            max_retries: 0,
            retry_delay_ms: 10,
        },
        pipes: PipeConfig::default(),
        router: RouterConfig::default(),
        evaluation: EvaluationConfig {
            winner_threshold: 0.05,
            scenario_timeout_ms: 10_000,
            pacing_ms: 0,
        },
        rate_limit: RateLimitConfig::default(),
    };
    let client = LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone())
        .expect("Failed to create client");
    AppState::new(config, Arc::new(client))
}

fn scenario_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!([
            {
                "id": "whistleblowing",
                "query": "¿Cómo monto un canal de denuncias?",
                "expected_domain_terms": ["canal", "confidencialidad", "investigación"],
                "complexity": "high"
            },
            {
                "id": "training",
                "query": "¿Cada cuánto formamos a la plantilla?",
                "context": {"company_size": "40"},
                "expected_domain_terms": ["formar"]
            }
        ])
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_suite_over_loaded_scenarios() {
    let server = MockServer::start().await;
    // One standard call plus five P4 stages per scenario.
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "completion": ANSWER
        })))
        .expect(12)
        .mount(&server)
        .await;

    let file = scenario_file();
    let scenarios = load_scenarios(file.path()).unwrap();
    let state = state_for(&server);

    let report = state
        .evaluation_harness(QualityScorer::default())
        .run_suite(&scenarios)
        .await;

    assert_eq!(report.total_scenarios, 2);
    assert_eq!(report.p4_wins + report.standard_wins + report.ties, 2);
    assert_eq!(report.scenarios[0].scenario_id, "whistleblowing");
    assert!(report.mean_p4_combined > 0.0);
    assert!(report.mean_standard_combined > 0.0);
    assert!(!report.recommendations.is_empty());

    // Same answer text on both sides: P4 only differs by confidence,
    // suggestions and reflection metadata, none of which can lose to standard.
    for outcome in &report.scenarios {
        assert_ne!(outcome.winner, Winner::Standard);
    }
}

#[tokio::test]
async fn test_suite_survives_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;

    let file = scenario_file();
    let scenarios = load_scenarios(file.path()).unwrap();
    let report = state_for(&server)
        .evaluation_harness(QualityScorer::default())
        .run_suite(&scenarios)
        .await;

    // Both sides degrade to canned answers, but every scenario is reported.
    assert_eq!(report.total_scenarios, 2);
    assert_eq!(report.scenarios.len(), 2);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "completion": ANSWER
        })))
        .mount(&server)
        .await;

    let file = scenario_file();
    let scenarios = load_scenarios(file.path()).unwrap();
    let report = state_for(&server)
        .evaluation_harness(QualityScorer::default())
        .run_suite(&scenarios[..1])
        .await;

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["total_scenarios"], 1);
    assert!(value["run_id"].as_str().is_some());
    assert!(value["started_at"].as_str().is_some());
}
