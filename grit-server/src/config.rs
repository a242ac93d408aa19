use std::path::PathBuf;

use clap::Parser;

/// Server configuration, constructed once at startup from CLI flags and/or
/// environment variables.
///
/// Nothing in the request-handling path reads `std::env::var` directly;
/// every tunable lives here and is threaded through as shared `axum` state.
#[derive(Debug, Clone, Parser)]
#[command(name = "grit-server", about = "HTTP server exposing grit repositories")]
pub struct Config {
    /// TCP port to listen on.
    #[arg(long, env = "GRIT_SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, env = "GRIT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Directory of static UI assets served under `/static/<path>`.
    #[arg(long, env = "GRIT_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Root directory under which repositories are looked up by path.
    #[arg(long, env = "GRIT_REPO_ROOT", default_value = ".")]
    pub repo_root: PathBuf,

    /// Optional path segment that decorates every URL (`.*?/<marker>` is
    /// stripped before interpreting the remainder as a repo-relative path).
    #[arg(long, env = "GRIT_URI_MARKER")]
    pub uri_marker: Option<String>,
}

impl Config {
    pub fn tracing_filter(&self) -> String {
        self.log_level.clone()
    }
}
