//! calend CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::warn;

use calend_client::cli::{Cli, Command, ConfigAction};
use calend_client::commands;
use calend_client::config::ClientConfig;
use calend_client::error::ClientResult;
use calend_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_benign() => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let loaded = ClientConfig::load(cli.config.as_deref());

    match cli.command {
        #[cfg(feature = "google")]
        Command::Init { credentials, force } => {
            commands::init::run(&credentials, force, &loaded?, &config_path).await
        }
        #[cfg(not(feature = "google"))]
        Command::Init { .. } => Err(calend_client::ClientError::Config(
            "calend was built without Google Calendar support".to_string(),
        )),
        Command::Add(args) => {
            let config = loaded?;
            let now = Utc::now().with_timezone(&config.calendar.tz()?);

            if args.dry_run {
                let requests = commands::add::plan(&args, &now)?;
                return commands::add::print_requests(&requests);
            }

            let provider = commands::connect(&config)?;
            let requests = commands::add::plan(&args, &now)?;
            commands::add::insert(&provider, &config.calendar.id, &requests).await?;
            Ok(())
        }
        Command::Delete { name } => {
            let config = loaded?;
            let provider = commands::connect(&config)?;
            commands::delete::run(&provider, &config.calendar.id, &name).await?;
            Ok(())
        }
        Command::List { name } => {
            let config = loaded?;
            let provider = commands::connect(&config)?;
            commands::list::run(&provider, &config.calendar.id, name.as_deref()).await?;
            Ok(())
        }
        Command::Uninstall => {
            let config = loaded.unwrap_or_else(|e| {
                warn!("ignoring unreadable configuration: {}", e);
                ClientConfig::default()
            });
            commands::uninstall::run(
                token_path(&config).as_deref(),
                &[
                    ClientConfig::default_config_dir(),
                    ClientConfig::default_data_dir(),
                ],
            )?;
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&loaded?, &config_path),
            ConfigAction::Validate => commands::config::validate(&loaded?),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}

#[cfg(feature = "google")]
fn token_path(config: &ClientConfig) -> Option<PathBuf> {
    Some(config.token_path())
}

#[cfg(not(feature = "google"))]
fn token_path(_config: &ClientConfig) -> Option<PathBuf> {
    None
}
