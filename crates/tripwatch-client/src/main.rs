//! tripwatch CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tripwatch_core::{TracingConfig, init_tracing};

use tripwatch_client::cli::{BookingAction, Cli, Command, ConfigAction};
use tripwatch_client::commands;
use tripwatch_client::config::ClientConfig;
use tripwatch_client::{App, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match &cli.command {
        Command::Run { json_logs: true } => TracingConfig::daemon(),
        Command::Run { json_logs: false } if !cli.verbose => TracingConfig::default(),
        _ => TracingConfig::cli(cli.verbose),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let (config, config_path) = match cli.config {
        Some(path) => (ClientConfig::load_from(&path)?, path),
        None => (ClientConfig::load()?, ClientConfig::default_path()),
    };

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        },
        Command::Booking { action } => {
            let app = App::new(config)?;
            match action {
                BookingAction::Add {
                    reference,
                    date_of_birth,
                    surname,
                    calendars,
                } => {
                    commands::booking::add(&app, &reference, &date_of_birth, &surname, calendars)
                        .await?;
                    Ok(())
                }
                BookingAction::Remove { reference } => {
                    commands::booking::remove(&app, &reference).await
                }
                BookingAction::List => commands::booking::list(&app),
            }
        }
        Command::Status { reference, json } => {
            commands::inspect::status(&App::new(config)?, &reference, json).await
        }
        Command::Events { reference, all } => {
            commands::inspect::events(&App::new(config)?, &reference, all).await
        }
        Command::Image { reference, output } => {
            commands::inspect::image(&App::new(config)?, &reference, &output).await?;
            Ok(())
        }
        Command::Run { .. } => commands::run::run(&App::new(config)?).await,
    }
}
