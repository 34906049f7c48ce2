//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the filter is chosen from the
//! verbosity flag.

use tracing_subscriber::EnvFilter;

/// Default filter for a verbosity level (number of `-v` flags)
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "info,game_store=debug,chess_sim=debug,backend=debug,chess_archive=debug",
        _ => "debug",
    }
}

/// Install the global fmt subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
