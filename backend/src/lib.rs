//! backend: read-only HTTP API over the game archive.

pub mod api;
pub mod config;
pub mod error;
pub mod query;

pub use config::{ConfigError, CorsConfig, ServerConfig};
pub use error::ApiError;
pub use query::QueryService;
