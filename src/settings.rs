//! Settings persistence
//!
//! Loads and saves [`ArchiveSettings`] as JSON. Values come from three
//! layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. the settings file
//! 3. environment variables and command-line flags (applied by the binary)
//!
//! # File Location
//!
//! `settings.json` in the user's configuration directory, e.g.
//! `~/.config/chessarchive/settings.json` on Linux. Falls back to a local
//! `settings.json` when no config directory can be resolved.
//!
//! # Error Handling
//!
//! Loading never fails: a missing, unreadable or malformed file logs a
//! warning and yields defaults. Saving reports errors to the caller.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backend::{CorsConfig, ServerConfig};
use chess_sim::{DriverConfig, DEFAULT_JITTER, DEFAULT_TOP_K};
use directories::ProjectDirs;
use game_store::DEFAULT_ID_WIDTH;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Settings filename
const SETTINGS_FILENAME: &str = "settings.json";

/// Widest id that still fits comfortably in a u64 of random digits
const MAX_ID_WIDTH: usize = 18;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Everything the archive binary can be configured with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Root directory holding one subdirectory per game
    pub games_dir: PathBuf,
    /// Number of digits in a game id
    pub id_width: usize,
    /// Address the query API listens on
    pub bind_addr: SocketAddr,
    /// Pause between simulated moves, in milliseconds
    pub move_delay_ms: u64,
    /// Number of best-scored moves the policy picks from
    pub top_k: usize,
    /// Upper bound of the random bonus added to each move score
    pub jitter: i32,
    /// Pause games after this many moves, leaving them active; unlimited
    /// when absent
    pub max_plies: Option<usize>,
    /// Base seed for reproducible games; OS entropy when absent
    pub seed: Option<u64>,
    pub cors: CorsConfig,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            games_dir: server.games_dir,
            id_width: DEFAULT_ID_WIDTH,
            bind_addr: server.bind_addr,
            move_delay_ms: 2_000,
            top_k: DEFAULT_TOP_K,
            jitter: DEFAULT_JITTER,
            max_plies: None,
            seed: None,
            cors: server.cors,
        }
    }
}

/// Helper to resolve the settings file path
pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "trilltino", "ChessArchive") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        PathBuf::from(SETTINGS_FILENAME)
    }
}

impl ArchiveSettings {
    /// Load from `path`, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ArchiveSettings>(&contents) {
                Ok(settings) => {
                    info!("[SETTINGS] Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!(
                        "[SETTINGS] Failed to parse settings file at {:?}: {}. Using defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    "[SETTINGS] Failed to read settings file at {:?}: {}. Using defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("[SETTINGS] Saved settings to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.id_width == 0 || self.id_width > MAX_ID_WIDTH {
            return Err(SettingsError::Invalid {
                field: "id_width",
                reason: format!("must be between 1 and {}, got {}", MAX_ID_WIDTH, self.id_width),
            });
        }
        if self.top_k == 0 {
            return Err(SettingsError::Invalid {
                field: "top_k",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.jitter < 0 {
            return Err(SettingsError::Invalid {
                field: "jitter",
                reason: format!("must not be negative, got {}", self.jitter),
            });
        }
        Ok(())
    }

    /// Apply `BIND_ADDR`, `GAMES_DIR`, `GAME_ID_WIDTH` and `CORS_*` overrides
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), backend::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut server = self.server_config();
        server.apply_lookup(lookup)?;
        self.bind_addr = server.bind_addr;
        self.games_dir = server.games_dir;
        self.id_width = server.id_width;
        self.cors = server.cors;
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            games_dir: self.games_dir.clone(),
            id_width: self.id_width,
            cors: self.cors.clone(),
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            move_delay: Duration::from_millis(self.move_delay_ms),
            max_plies: self.max_plies,
        }
    }
}
