//! chess-archive: simulate concurrent chess games and serve their histories.
//!
//! The heavy lifting lives in the workspace crates:
//! - `game_store`: per-game durable histories and id allocation
//! - `chess_sim`: rules, move policy and the simulation driver
//! - `backend`: the read-only HTTP query API
//!
//! This crate wires them together behind the `chess-archive` binary.

pub mod cli;
pub mod logging;
pub mod runner;
pub mod settings;

pub use settings::{ArchiveSettings, SettingsError};
