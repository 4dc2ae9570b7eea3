//! Runtime configuration: CLI flags (via `clap`) layered over environment variables
//! layered over hardcoded defaults (§6, §10.3).
//!
//! Grounded on the teacher's `core::config` env-var-first `resolve_*()` pattern and
//! on `original_source/scraper/config.py`'s `AppConfig`/`with_cli_overrides` shape —
//! including the `--url`-without-`--mode` implies `single_url` convention (SPEC_FULL §11.5).

use std::fmt;
use std::str::FromStr;

use clap::Parser;

use crate::core::constants::{
    DEFAULT_DISCOVERY_TIMEOUT_SECONDS, DEFAULT_MAX_PAGES_PER_SOURCE, DEFAULT_REQUEST_DELAY_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    Scrape,
    Discover,
    DiscoverAndScrape,
    SingleUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Mongo,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Mongo,
    Txt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Google,
    Openai,
    Openrouter,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($str => Ok($ty::$variant),)+
                    other => Err(format!("invalid {}: {other}", stringify!($ty))),
                }
            }
        }
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($ty::$variant => $str,)+
                };
                write!(f, "{s}")
            }
        }
    };
}

str_enum!(AgentMode {
    Scrape => "scrape",
    Discover => "discover",
    DiscoverAndScrape => "discover_and_scrape",
    SingleUrl => "single_url",
});
str_enum!(InputMode { Mongo => "mongo", Csv => "csv" });
str_enum!(LogMode { Mongo => "mongo", Txt => "txt" });
str_enum!(LlmProvider { Google => "google", Openai => "openai", Openrouter => "openrouter" });

/// CLI grammar (§6). Every flag is optional here — absence means "fall through to
/// the environment/default resolution in [`AppConfig::resolve`]".
#[derive(Debug, Parser)]
#[command(name = "agent", about = "Autonomous mandi price discovery and scrape agent")]
pub struct CliArgs {
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    #[arg(long, value_name = "INPUT")]
    pub input: Option<String>,

    #[arg(long, value_name = "LOG")]
    pub log: Option<String>,

    #[arg(long, value_name = "BOOL")]
    pub headless: Option<bool>,
}

/// Fully-resolved runtime configuration, built by [`AppConfig::resolve`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo_uri: String,
    pub db_name: String,

    pub llm_provider: LlmProvider,
    pub google_api_key: String,
    pub openai_api_key: String,
    pub openrouter_api_key: String,
    /// Ordered fallback list parsed from a comma-separated `OPENROUTER_MODEL` (SPEC_FULL §11.2).
    pub openrouter_models: Vec<String>,

    pub input_mode: InputMode,
    pub log_mode: LogMode,
    pub agent_mode: AgentMode,

    pub headless: bool,

    pub max_pages_per_source: usize,
    pub discovery_timeout_seconds: u64,
    pub request_delay_ms: u64,

    /// Set by `--url`; required when `agent_mode == SingleUrl`.
    pub target_url: Option<String>,

    pub csv_input_path: String,
    pub csv_output_dir: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl AppConfig {
    /// Resolve configuration: CLI flag → environment variable → hardcoded default.
    pub fn resolve(cli: &CliArgs) -> Result<Self, String> {
        let mongo_uri = env_or("MONGO_URI", "");
        let db_name = env_or("DB_NAME", "mandi_insights");

        let llm_provider: LlmProvider =
            env_or("LLM_PROVIDER", "google").parse().unwrap_or(LlmProvider::Google);

        let openrouter_models: Vec<String> = std::env::var("OPENROUTER_MODEL")
            .ok()
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or_default();

        let input_mode: InputMode = match &cli.input {
            Some(v) => v.parse()?,
            None => env_or("INPUT_MODE", "mongo").parse().unwrap_or(InputMode::Mongo),
        };

        let log_mode: LogMode = match &cli.log {
            Some(v) => v.parse()?,
            None => env_or("LOG_MODE", "mongo").parse().unwrap_or(LogMode::Mongo),
        };

        // --url-without-explicit---mode implies single_url (SPEC_FULL §11.5).
        let agent_mode: AgentMode = match (&cli.mode, &cli.url) {
            (Some(m), _) => m.parse()?,
            (None, Some(_)) => AgentMode::SingleUrl,
            (None, None) => env_or("AGENT_MODE", "discover_and_scrape")
                .parse()
                .unwrap_or(AgentMode::DiscoverAndScrape),
        };

        let headless = cli.headless.unwrap_or_else(|| env_bool("HEADLESS", true));

        Ok(Self {
            mongo_uri,
            db_name,
            llm_provider,
            google_api_key: env_or("GOOGLE_API_KEY", ""),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openrouter_api_key: env_or("OPENROUTER_API_KEY", ""),
            openrouter_models,
            input_mode,
            log_mode,
            agent_mode,
            headless,
            max_pages_per_source: env_parsed(
                "MAX_PAGES_PER_SOURCE",
                DEFAULT_MAX_PAGES_PER_SOURCE,
            ),
            discovery_timeout_seconds: env_parsed(
                "DISCOVERY_TIMEOUT_SECONDS",
                DEFAULT_DISCOVERY_TIMEOUT_SECONDS,
            ),
            request_delay_ms: env_parsed("REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS),
            target_url: cli.url.clone(),
            csv_input_path: env_or("CSV_INPUT_PATH", "data/samples/sources.csv"),
            csv_output_dir: env_or("CSV_OUTPUT_DIR", "data/outputs"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_mode_implies_single_url() {
        let cli = CliArgs {
            mode: None,
            url: Some("https://example.com".into()),
            input: None,
            log: None,
            headless: None,
        };
        let cfg = AppConfig::resolve(&cli).unwrap();
        assert_eq!(cfg.agent_mode, AgentMode::SingleUrl);
    }

    #[test]
    fn explicit_mode_wins_over_url_implication() {
        let cli = CliArgs {
            mode: Some("scrape".into()),
            url: Some("https://example.com".into()),
            input: None,
            log: None,
            headless: None,
        };
        let cfg = AppConfig::resolve(&cli).unwrap();
        assert_eq!(cfg.agent_mode, AgentMode::Scrape);
    }

    #[test]
    fn openrouter_models_parsed_as_ordered_list() {
        std::env::set_var("OPENROUTER_MODEL", "model-a, model-b,model-c");
        let cli = CliArgs { mode: None, url: None, input: None, log: None, headless: None };
        let cfg = AppConfig::resolve(&cli).unwrap();
        assert_eq!(cfg.openrouter_models, vec!["model-a", "model-b", "model-c"]);
        std::env::remove_var("OPENROUTER_MODEL");
    }
}
