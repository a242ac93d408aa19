//! HTTP server exposing `grit` repositories over smart-HTTP and JSON/RPC.
//!
//! Split into a library and a thin binary so the router can be exercised
//! directly from integration tests (`tests/`) via `tower::ServiceExt::oneshot`
//! instead of only through a bound TCP socket.

pub mod config;
pub mod error;
pub mod router;
pub mod rpc;
pub mod smart_http;
pub mod state;
pub mod static_files;

pub use config::Config;
pub use state::AppState;
