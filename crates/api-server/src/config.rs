use anyhow::{bail, Context, Result};
use scoring_engine::ForestConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// What `POST /api/v1/refresh` does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Reply with an acknowledgement and touch nothing
    Acknowledge,
    /// Run one serialized scoring cycle before replying
    Pipeline,
}

impl FromStr for RefreshMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledge" | "ack" | "stub" => Ok(RefreshMode::Acknowledge),
            "pipeline" | "run" => Ok(RefreshMode::Pipeline),
            other => bail!("Unknown REFRESH_MODE '{}' (expected acknowledge or pipeline)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub db_url: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub refresh_mode: RefreshMode,
    pub ws_poll_interval: Duration,
    /// Zero disables the placeholder job
    pub scheduler_interval: Duration,
    pub forest: ForestConfig,
    pub persist_news: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            db_url: "sqlite:credit.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string(), "*".to_string()],
            refresh_mode: RefreshMode::Acknowledge,
            ws_poll_interval: Duration::from_secs(5),
            scheduler_interval: Duration::from_secs(10),
            forest: ForestConfig::default(),
            persist_news: true,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str, default: String| lookup(key).unwrap_or(default);

        let max_depth = match lookup("MODEL_MAX_DEPTH") {
            Some(v) if !v.trim().is_empty() => {
                Some(v.trim().parse().context("MODEL_MAX_DEPTH must be a positive integer")?)
            }
            _ => None,
        };

        let config = Self {
            db_url: var("DB_URL", defaults.db_url),
            host: var("API_HOST", defaults.host),
            port: var("API_PORT", defaults.port.to_string())
                .parse()
                .context("API_PORT must be a port number")?,
            cors_origins: var("CORS_ORIGINS", defaults.cors_origins.join(","))
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            refresh_mode: var("REFRESH_MODE", "acknowledge".to_string()).parse()?,
            ws_poll_interval: Duration::from_secs(
                var("WS_POLL_INTERVAL_SECS", "5".to_string())
                    .parse()
                    .context("WS_POLL_INTERVAL_SECS must be whole seconds")?,
            ),
            scheduler_interval: Duration::from_secs(
                var("SCHEDULER_INTERVAL_SECS", "10".to_string())
                    .parse()
                    .context("SCHEDULER_INTERVAL_SECS must be whole seconds")?,
            ),
            forest: ForestConfig {
                n_estimators: var("MODEL_N_ESTIMATORS", defaults.forest.n_estimators.to_string())
                    .parse()
                    .context("MODEL_N_ESTIMATORS must be a positive integer")?,
                random_state: var("MODEL_RANDOM_STATE", defaults.forest.random_state.to_string())
                    .parse()
                    .context("MODEL_RANDOM_STATE must be an unsigned integer")?,
                max_depth,
                ..defaults.forest
            },
            persist_news: var("PERSIST_NEWS_EVENTS", "true".to_string())
                .parse()
                .context("PERSIST_NEWS_EVENTS must be true or false")?,
        };

        if config.ws_poll_interval.is_zero() {
            bail!("WS_POLL_INTERVAL_SECS must be greater than zero");
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
