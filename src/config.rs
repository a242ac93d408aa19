use crate::error::{Error, Result};

/// Runtime configuration for the object store side of grit.
///
/// The HTTP server has its own, larger `Config` (port, static directory,
/// URI marker) built via `clap` in `grit-server`; this one covers the
/// handful of values the library itself reads from the environment rather
/// than receiving as explicit arguments — kept as a struct threaded through
/// construction rather than read ad hoc, per the environment variables
/// listed in the external interfaces.
#[derive(Debug, Clone)]
pub struct Config {
    /// `GRIT_LOG_LEVEL` — a `log`/`tracing` level name or numeric value.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build a `Config` from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("GRIT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        validate_log_level(&log_level)?;
        Ok(Self { log_level })
    }
}

fn validate_log_level(level: &str) -> Result<()> {
    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    if level.parse::<i64>().is_ok() {
        return Ok(());
    }
    if LEVELS.contains(&level.to_lowercase().as_str()) {
        return Ok(());
    }
    Err(Error::config(format!("invalid GRIT_LOG_LEVEL: {}", level)))
}
