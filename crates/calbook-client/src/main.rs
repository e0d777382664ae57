//! calbook CLI entry point.

use std::io;
use std::process::ExitCode;

use calbook_core::{TracingConfig, init_tracing};
use chrono::Utc;
use clap::Parser;

use calbook_client::cli::{AuthProvider, Cli, Command, ConfigAction, DEFAULT_UPCOMING_COUNT};
use calbook_client::commands;
use calbook_client::commands::calendar::{CalendarCommand, Outcome};
use calbook_client::config::{ClientConfig, CredentialOverrides};
use calbook_client::error::ClientResult;
use calbook_client::Agenda;

/// Exit code of `calbook free` when the range holds events.
const EXIT_BUSY: u8 = 3;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    }
    .with_format(cli.log_format());
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<ExitCode> {
    let (config, config_path) = match cli.config {
        Some(path) => (ClientConfig::load_from(&path)?, path),
        None => (ClientConfig::load()?, ClientConfig::default_path()),
    };
    let config = config.with_overrides(cli.calendar, cli.timezone);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let command = match cli.command {
        Some(Command::Auth {
            provider:
                AuthProvider::Google {
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                },
        }) => {
            let overrides = CredentialOverrides {
                client_id,
                client_secret,
                credentials_file,
            };
            commands::auth::google(overrides, force, &config, &mut out).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Command::Config { action }) => {
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path, &mut out)?,
                ConfigAction::Validate => commands::config::validate(&config, &mut out)?,
                ConfigAction::Path => commands::config::path(&config, &config_path, &mut out)?,
            }
            return Ok(ExitCode::SUCCESS);
        }
        Some(command) => command,
        None => Command::Upcoming {
            count: DEFAULT_UPCOMING_COUNT,
        },
    };

    let Some((command, timezone)) = CalendarCommand::prepare(command, &config)? else {
        return Ok(ExitCode::SUCCESS);
    };

    let provider = commands::auth::connect_google(&config).await?;
    let agenda = Agenda::new(&provider, &config.calendar.id, timezone);

    match command.run(&agenda, Utc::now(), &mut out).await? {
        Outcome::Done => Ok(ExitCode::SUCCESS),
        Outcome::Busy => Ok(ExitCode::from(EXIT_BUSY)),
    }
}
