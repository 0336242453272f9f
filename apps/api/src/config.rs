use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub token_secret: String,
    pub scorer_url: String,
    pub scorer_timeout_secs: u64,
    pub session_history_limit: usize,
    pub session_idle_minutes: i64,
    pub session_max_count: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            token_secret: require_env("TOKEN_SECRET")?,
            scorer_url: std::env::var("SCORER_URL")
                .unwrap_or_else(|_| "http://localhost:5002".to_string()),
            scorer_timeout_secs: parse_env("SCORER_TIMEOUT_SECS", 120)?,
            session_history_limit: parse_env("SESSION_HISTORY_LIMIT", 20)?,
            session_idle_minutes: parse_env("SESSION_IDLE_MINUTES", 60)?,
            session_max_count: parse_env("SESSION_MAX_COUNT", 10_000)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Config used by in-process tests; never touches the environment.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            token_secret: "test-secret".to_string(),
            scorer_url: "http://127.0.0.1:9".to_string(),
            scorer_timeout_secs: 5,
            session_history_limit: 3,
            session_idle_minutes: 60,
            session_max_count: 100,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
