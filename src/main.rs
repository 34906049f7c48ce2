use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use chess_archive::cli::{Cli, Command};
use chess_archive::settings::{self, ArchiveSettings};
use chess_archive::{logging, runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings_file = cli.config.clone().unwrap_or_else(settings::settings_path);
    let mut settings = ArchiveSettings::load_from(&settings_file);
    settings
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment configuration")?;
    cli.apply(&mut settings);
    settings.validate()?;

    if let Command::SaveSettings(_) = &cli.command {
        settings
            .save_to(&settings_file)
            .with_context(|| format!("Cannot write settings to {:?}", settings_file))?;
        println!("{}", settings_file.display());
        return Ok(());
    }

    let registry = runner::open_registry(&settings)
        .with_context(|| format!("Cannot open games directory {:?}", settings.games_dir))?;
    info!(
        games_dir = %settings.games_dir.display(),
        "[CLI] Using games directory"
    );

    match &cli.command {
        Command::Serve(_) => runner::serve(registry, &settings).await?,
        Command::Simulate(args) => {
            let reports = runner::simulate(registry, &settings, args.games).await?;
            let failed = runner::print_reports(&reports);
            if failed > 0 {
                bail!("{} of {} game(s) failed", failed, reports.len());
            }
        }
        Command::Resume(_) => {
            let reports = runner::resume(registry, &settings).await?;
            let failed = runner::print_reports(&reports);
            if failed > 0 {
                bail!("{} of {} game(s) failed", failed, reports.len());
            }
        }
        Command::Run { simulate, .. } => runner::run(registry, &settings, simulate.games).await?,
        Command::SaveSettings(_) => {}
        Command::Status => {
            for game in runner::status(&registry)? {
                let length = game
                    .history_length
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unreadable".to_string());
                println!("{}  {:<10}  {}", game.game_id, game.lifecycle.label(), length);
            }
        }
    }

    Ok(())
}
