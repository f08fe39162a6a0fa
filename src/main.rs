use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use compliance_reasoning::{
    completion::LangbaseClient,
    config::{Config, LogFormat, LoggingConfig, RouterConfig},
    evaluation::{default_scenarios, load_scenarios, QualityScorer},
    modes::Router,
    query::{ContextValue, Query, QueryContext},
    service::AppState,
};

#[derive(Parser)]
#[command(name = "compliance-reasoning", version, about = "Reflective compliance reasoning CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show where a query would be routed, without calling the model
    Route {
        /// Query text
        text: String,
        /// Context entries as key=value (repeatable)
        #[arg(long = "context", value_parser = parse_context_pair)]
        context: Vec<(String, ContextValue)>,
    },

    /// Route and answer a query
    Ask {
        /// Query text
        text: String,
        /// Context entries as key=value (repeatable)
        #[arg(long = "context", value_parser = parse_context_pair)]
        context: Vec<(String, ContextValue)>,
        /// Session identifier (random when omitted)
        #[arg(long)]
        session: Option<String>,
        /// Caller profile tag
        #[arg(long, default_value = "default")]
        profile: String,
    },

    /// Run the standard vs P4 evaluation suite
    Evaluate {
        /// JSON file with scenarios (built-in set when omitted)
        #[arg(long)]
        scenarios: Option<PathBuf>,
    },
}

fn parse_context_pair(raw: &str) -> Result<(String, ContextValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected key=value, got: {}", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Empty context key in: {}", raw));
    }
    Ok((key.to_string(), ContextValue::parse_scalar(value)))
}

fn build_query(text: String, context: Vec<(String, ContextValue)>) -> Query {
    let context = context
        .into_iter()
        .fold(QueryContext::default(), |ctx, (key, value)| ctx.with(key, value));
    Query::new(text).with_context(context)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Route { text, context } => {
            // Routing needs no credentials, only the router and logging settings.
            let _ = dotenvy::dotenv();
            init_logging(&LoggingConfig::from_env());
            let decision = Router::new(RouterConfig::from_env()).route(&build_query(text, context));
            print_json(&decision)
        }
        Command::Ask {
            text,
            context,
            session,
            profile,
        } => {
            let state = build_state()?;
            let mut query = build_query(text, context).with_profile(profile);
            if let Some(session) = session {
                query = query.with_session(session);
            }
            let response = state.handle(&query).await?;
            print_json(&response)
        }
        Command::Evaluate { scenarios } => {
            let state = build_state()?;
            let scenarios = match scenarios {
                Some(path) => load_scenarios(&path)
                    .with_context(|| format!("Loading scenarios from {}", path.display()))?,
                None => default_scenarios(),
            };
            info!(scenarios = scenarios.len(), "Running evaluation suite");
            let report = state
                .evaluation_harness(QualityScorer::default())
                .run_suite(&scenarios)
                .await;
            print_json(&report)
        }
    }
}

/// Load configuration, start logging and connect the completion client.
fn build_state() -> anyhow::Result<AppState> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Compliance reasoning starting..."
    );

    let client = match LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %c.base_url(), pipe = %c.pipe_name(), "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    Ok(AppState::new(config, Arc::new(client)))
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
