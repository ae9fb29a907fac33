//! Configuration loaded from environment variables.
//!
//! Every external credential is optional: a missing key degrades the
//! corresponding provider to an empty contribution instead of failing the
//! run, so a keyless development setup is a fully supported configuration.

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

const DEFAULT_FEED_URL: &str =
    "https://www.petfinder.com/animal-shelters-and-rescues/search/?country=US";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Credentials; all optional.
    pub serpapi_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub apollo_api_key: Option<String>,
    pub storage_url: Option<String>,
    pub storage_key: Option<String>,

    // Time budgets and circuit breakers.
    pub max_runtime: Duration,
    pub serp_stage_max: Duration,
    pub serp_failure_budget: u32,
    pub serp_http_timeout: Duration,
    pub places_stage_max: Duration,
    pub places_tile_error_cap: u32,
    pub places_http_timeout: Duration,
    pub llm_timeout: Duration,

    // Optional LLM features.
    pub llm_model: String,
    pub openai_api_base: String,
    pub llm_justifications_enabled: bool,

    // Headless-render fallback.
    pub renderer_enabled: bool,
    pub renderer_url: Option<String>,
    pub renderer_timeout: Duration,

    // Feed import.
    pub feed_url: String,

    /// Last-resort location match: raw query substring against notes text.
    /// Weaker than the structured checks; kept as a tunable.
    pub notes_location_fallback: bool,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenv();

        Self {
            serpapi_key: non_empty(env::var("SERPAPI_KEY").ok()),
            google_maps_api_key: non_empty(
                env::var("GOOGLE_MAPS_API_KEY")
                    .or_else(|_| env::var("GOOGLE_PLACES_API_KEY"))
                    .ok(),
            ),
            openai_api_key: non_empty(env::var("OPENAI_API_KEY").ok()),
            apollo_api_key: non_empty(env::var("APOLLO_API_KEY").ok()),
            storage_url: non_empty(env::var("SUPABASE_URL").ok()),
            storage_key: non_empty(env::var("SUPABASE_PUBLISHABLE_KEY").ok()),

            max_runtime: secs_var("DISCOVERY_MAX_RUNTIME_SECONDS", 420.0),
            serp_stage_max: secs_var("SERPAPI_STAGE_MAX_SECONDS", 90.0),
            serp_failure_budget: int_var("SERPAPI_MAX_QUERY_FAILURES", 4),
            serp_http_timeout: secs_var("SERPAPI_HTTP_TIMEOUT_SECONDS", 8.0),
            places_stage_max: secs_var("GOOGLE_PLACES_STAGE_MAX_SECONDS", 180.0),
            places_tile_error_cap: int_var("GOOGLE_PLACES_MAX_TILE_ERRORS", 10),
            places_http_timeout: secs_var("GOOGLE_PLACES_HTTP_TIMEOUT_SECONDS", 10.0),
            llm_timeout: secs_var("DISCOVERY_LLM_TIMEOUT_SECONDS", 12.0),

            llm_model: env::var("DISCOVERY_LLM_MODEL")
                .unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_justifications_enabled: bool_var("DISCOVERY_LLM_JUSTIFICATIONS_ENABLED", false),

            renderer_enabled: bool_var("RENDERER_ENABLED", false),
            renderer_url: non_empty(env::var("RENDERER_URL").ok()),
            renderer_timeout: secs_var("RENDERER_TIMEOUT_SECONDS", 20.0),

            feed_url: env::var("PETFINDER_FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string()),

            notes_location_fallback: bool_var("DISCOVERY_NOTES_LOCATION_FALLBACK", true),
        }
    }
}

impl Default for Config {
    /// Keyless defaults, independent of the process environment. Used by
    /// tests and seed-only runs.
    fn default() -> Self {
        Self {
            serpapi_key: None,
            google_maps_api_key: None,
            openai_api_key: None,
            apollo_api_key: None,
            storage_url: None,
            storage_key: None,
            max_runtime: Duration::from_secs(420),
            serp_stage_max: Duration::from_secs(90),
            serp_failure_budget: 4,
            serp_http_timeout: Duration::from_secs(8),
            places_stage_max: Duration::from_secs(180),
            places_tile_error_cap: 10,
            places_http_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(12),
            llm_model: "gpt-4.1-mini".to_string(),
            openai_api_base: "https://api.openai.com/v1".to_string(),
            llm_justifications_enabled: false,
            renderer_enabled: false,
            renderer_url: None,
            renderer_timeout: Duration::from_secs(20),
            feed_url: DEFAULT_FEED_URL.to_string(),
            notes_location_fallback: true,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn secs_var(name: &str, default: f64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default);
    Duration::from_secs_f64(secs)
}

fn int_var(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn bool_var(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_keyless() {
        let config = Config::default();
        assert!(config.serpapi_key.is_none());
        assert!(config.google_maps_api_key.is_none());
        assert_eq!(config.max_runtime, Duration::from_secs(420));
        assert_eq!(config.serp_failure_budget, 4);
        assert!(config.notes_location_fallback);
    }
}
