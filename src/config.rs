use anyhow::{bail, Context};
use tracing::Level;

pub const LOG_ENV: &str = "GRADEBOOKD_LOG";
pub const MAX_SESSIONS_ENV: &str = "GRADEBOOKD_MAX_SESSIONS";

const DEFAULT_MAX_SESSIONS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: Level,
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Config {
    /// Reads settings from the process environment (after any `.env` file
    /// has been loaded by the caller). Unset variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(raw) = lookup(LOG_ENV).filter(|s| !s.trim().is_empty()) {
            cfg.log_level = raw
                .trim()
                .parse::<Level>()
                .with_context(|| format!("{LOG_ENV}={raw:?} is not a log level"))?;
        }

        if let Some(raw) = lookup(MAX_SESSIONS_ENV).filter(|s| !s.trim().is_empty()) {
            let n: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_SESSIONS_ENV}={raw:?} is not a count"))?;
            if n == 0 {
                bail!("{MAX_SESSIONS_ENV} must be at least 1");
            }
            cfg.max_sessions = n;
        }

        Ok(cfg)
    }
}
