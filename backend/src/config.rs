//! Server configuration
//!
//! Loaded from the environment (after `.env` has been applied by the
//! binary). Every value has a default, so an empty environment yields a
//! server on `0.0.0.0:8000` reading `./chess_games` with permissive CORS.
//!
//! | Variable                 | Default       |
//! |--------------------------|---------------|
//! | `BIND_ADDR`              | `0.0.0.0:8000`|
//! | `GAMES_DIR`              | `chess_games` |
//! | `GAME_ID_WIDTH`          | `6`           |
//! | `CORS_ALLOW_ORIGINS`     | `*`           |
//! | `CORS_ALLOW_METHODS`     | `*`           |
//! | `CORS_ALLOW_HEADERS`     | `*`           |
//! | `CORS_ALLOW_CREDENTIALS` | `true`        |

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::{HeaderName, HeaderValue, Method};
use game_store::DEFAULT_ID_WIDTH;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_GAMES_DIR: &str = "chess_games";

const WILDCARD: &str = "*";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid bind address {0:?}")]
    InvalidBindAddr(String),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid CORS {kind} entry {value:?}")]
    InvalidCors { kind: &'static str, value: String },
}

/// Cross-origin policy for the query API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` allows any origin
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec![WILDCARD.to_string()],
            allow_methods: vec![WILDCARD.to_string()],
            allow_headers: vec![WILDCARD.to_string()],
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    /// Build the tower-http layer
    ///
    /// Browsers reject a literal `*` on credentialed requests, so wildcards
    /// become "mirror the request" when credentials are allowed.
    pub fn layer(&self) -> Result<CorsLayer, ConfigError> {
        let origins = if is_wildcard(&self.allow_origins) {
            if self.allow_credentials {
                AllowOrigin::mirror_request()
            } else {
                AllowOrigin::from(Any)
            }
        } else {
            let values = self
                .allow_origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidCors {
                        kind: "origin",
                        value: o.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowOrigin::list(values)
        };

        let methods = if is_wildcard(&self.allow_methods) {
            if self.allow_credentials {
                AllowMethods::mirror_request()
            } else {
                AllowMethods::from(Any)
            }
        } else {
            let values = self
                .allow_methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                        ConfigError::InvalidCors {
                            kind: "method",
                            value: m.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowMethods::list(values)
        };

        let headers = if is_wildcard(&self.allow_headers) {
            if self.allow_credentials {
                AllowHeaders::mirror_request()
            } else {
                AllowHeaders::from(Any)
            }
        } else {
            let values = self
                .allow_headers
                .iter()
                .map(|h| {
                    HeaderName::from_bytes(h.as_bytes()).map_err(|_| ConfigError::InvalidCors {
                        kind: "header",
                        value: h.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowHeaders::list(values)
        };

        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(self.allow_credentials))
    }
}

fn is_wildcard(values: &[String]) -> bool {
    values.is_empty() || values.iter().any(|v| v == WILDCARD)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub games_dir: PathBuf,
    /// Digits in a game id; must match the writer's width
    pub id_width: usize,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            games_dir: PathBuf::from(DEFAULT_GAMES_DIR),
            id_width: DEFAULT_ID_WIDTH,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(lookup)?;
        Ok(config)
    }

    /// Override fields whose variables are set, keeping the rest
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(addr.clone()))?;
        }
        if let Some(dir) = lookup("GAMES_DIR") {
            self.games_dir = PathBuf::from(dir);
        }
        if let Some(width) = lookup("GAME_ID_WIDTH") {
            self.id_width = width
                .trim()
                .parse()
                .ok()
                .filter(|w| *w > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "GAME_ID_WIDTH".to_string(),
                    value: width.clone(),
                })?;
        }
        if let Some(origins) = lookup("CORS_ALLOW_ORIGINS") {
            self.cors.allow_origins = split_list(&origins);
        }
        if let Some(methods) = lookup("CORS_ALLOW_METHODS") {
            self.cors.allow_methods = split_list(&methods);
        }
        if let Some(headers) = lookup("CORS_ALLOW_HEADERS") {
            self.cors.allow_headers = split_list(&headers);
        }
        if let Some(flag) = lookup("CORS_ALLOW_CREDENTIALS") {
            self.cors.allow_credentials =
                parse_bool(&flag).ok_or_else(|| ConfigError::InvalidValue {
                    key: "CORS_ALLOW_CREDENTIALS".to_string(),
                    value: flag.clone(),
                })?;
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
