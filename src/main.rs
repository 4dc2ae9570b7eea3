//! CLI entry point (§6, §10.3).
//!
//! Grounded on the teacher's `main.rs` idiom: parse CLI args, resolve config, init
//! `tracing`, build the shared `reqwest::Client`, then hand off to the mode dispatcher.
//! Exit code 0 covers both a clean run and a user interrupt; 1 is reserved for an
//! unhandled error surfaced from `runner::run` (§7).

use clap::Parser;
use mandi_agent::ai::oracle::Oracle;
use mandi_agent::core::config::{AppConfig, CliArgs};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match AppConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing();

    let client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let oracle = Oracle::from_config(
        client.clone(),
        config.llm_provider,
        &config.google_api_key,
        &config.openai_api_key,
        &config.openrouter_api_key,
        &config.openrouter_models,
    )
    .map_err(|e| tracing::warn!(error = %e, "no LLM oracle available — discovery/mapping will be skipped"))
    .ok();

    tracing::info!(mode = %config.agent_mode, input = %config.input_mode, "starting run");

    match mandi_agent::runner::run(&config, oracle.as_ref(), &client).await {
        Ok(()) => {
            tracing::info!("run complete");
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
