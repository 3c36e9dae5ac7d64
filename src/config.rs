// src/config.rs

use std::{env, net::SocketAddr, time::Duration};

use dotenvy::dotenv;
use url::Url;

/// Passing threshold applied to exams created without an explicit one.
pub const DEFAULT_PASSING_SCORE: i32 = 60;

/// Upper bound for every per-question and aggregate score.
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,

    /// OpenAI-compatible completion endpoint used for essay grading.
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,

    /// Bound on a single completion call.
    pub grading_timeout: Duration,
    /// Extra attempts after the first failed completion call.
    pub grading_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|addr| addr.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]);

        let llm_api_key = env::var("LLM_API_KEY").unwrap_or_default();

        let llm_api_base_url = env::var("LLM_API_BASE_URL")
            .ok()
            .filter(|raw| Url::parse(raw).is_ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let llm_model_name =
            env::var("LLM_MODEL_NAME").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let grading_timeout = env::var("GRADING_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let grading_max_retries = env::var("GRADING_MAX_RETRIES")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            log_dir,
            bind_addr,
            cors_origins,
            llm_api_key,
            llm_api_base_url,
            llm_model_name,
            grading_timeout,
            grading_max_retries,
        }
    }

    /// Configuration for tests: in-memory store, no LLM credentials, short timeouts.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            rust_log: "error".to_string(),
            log_dir: "logs".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origins: vec!["http://localhost:3000".to_string()],
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            grading_timeout: Duration::from_millis(200),
            grading_max_retries: 0,
        }
    }
}

/// Splits a comma separated origin list, dropping entries that are not valid URLs.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| Url::parse(origin).is_ok())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}
