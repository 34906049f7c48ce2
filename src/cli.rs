//! Command-line interface
//!
//! Flags only override; anything left unset keeps the value from the
//! settings file or environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::settings::ArchiveSettings;

/// Simulate chess games and serve their archived histories
#[derive(Parser, Debug)]
#[command(name = "chess-archive")]
#[command(about = "Simulate chess games and serve their archived histories", long_about = None)]
pub struct Cli {
    /// Root directory holding one subdirectory per game
    #[arg(long, global = true)]
    pub games_dir: Option<PathBuf>,

    /// Settings file to use instead of the per-user one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the read-only query API
    Serve(ServeArgs),

    /// Start new games and play them to completion
    Simulate(SimulateArgs),

    /// Continue every unfinished game found on disk
    Resume(DriveArgs),

    /// Serve the API while simulating new games in the same process
    Run {
        #[command(flatten)]
        serve: ServeArgs,
        #[command(flatten)]
        simulate: SimulateArgs,
    },

    /// List games with their lifecycle and history length
    Status,

    /// Write the effective settings (file, environment and flags) back to
    /// the settings file
    SaveSettings(SaveSettingsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SaveSettingsArgs {
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(flatten)]
    pub drive: DriveArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of games to start
    #[arg(long, default_value_t = 1)]
    pub games: usize,

    #[command(flatten)]
    pub drive: DriveArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DriveArgs {
    /// Pause between moves in milliseconds
    #[arg(long)]
    pub move_delay_ms: Option<u64>,

    /// Pause each game after this many moves; `resume` continues it
    #[arg(long)]
    pub max_plies: Option<usize>,

    /// Candidate moves to pick from
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Base seed for reproducible games
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Fold every flag that was given into `settings`
    pub fn apply(&self, settings: &mut ArchiveSettings) {
        if let Some(dir) = &self.games_dir {
            settings.games_dir = dir.clone();
        }
        match &self.command {
            Command::Serve(serve) => serve.apply(settings),
            Command::Simulate(simulate) => simulate.drive.apply(settings),
            Command::Resume(drive) => drive.apply(settings),
            Command::Run { serve, simulate } => {
                serve.apply(settings);
                simulate.drive.apply(settings);
            }
            Command::Status => {}
            Command::SaveSettings(save) => {
                save.serve.apply(settings);
                save.drive.apply(settings);
            }
        }
    }
}

impl ServeArgs {
    fn apply(&self, settings: &mut ArchiveSettings) {
        if let Some(bind) = self.bind {
            settings.bind_addr = bind;
        }
    }
}

impl DriveArgs {
    fn apply(&self, settings: &mut ArchiveSettings) {
        if let Some(ms) = self.move_delay_ms {
            settings.move_delay_ms = ms;
        }
        if let Some(max) = self.max_plies {
            settings.max_plies = Some(max);
        }
        if let Some(k) = self.top_k {
            settings.top_k = k;
        }
        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
    }
}
