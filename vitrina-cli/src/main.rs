use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod commands;
mod config;
mod error;

use cli::{CliArgs, Command};
use config::AppConfig;
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) -> Result<(), AppError> {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so command output can be piped
    let writer = match &args.log_file {
        Some(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(MakeWriterExt::and(std::io::stderr, log_file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(args.log_file.is_none())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();
    init_logging(&args)?;

    let app_config = AppConfig::load(args.config.as_deref())?;
    debug!(?app_config, "Loaded configuration");

    let version = args.cache_version.as_deref();

    match args.command {
        Command::Stamp(stamp) => {
            let version = commands::stamp(&stamp)?;
            println!("{version}");
        }
        Command::Install => commands::install(app_config.to_worker_config(version)?).await?,
        Command::Fetch(fetch) => commands::fetch(app_config.to_worker_config(version)?, &fetch).await?,
        Command::Sync { tag } => commands::sync(app_config.to_worker_config(version)?, tag).await?,
        Command::Push { payload } => commands::push(app_config.to_worker_config(version)?, payload).await?,
        Command::Message { json } => commands::message(app_config.to_worker_config(version)?, &json).await?,
        Command::Partitions => commands::partitions(app_config.to_worker_config(version)?).await?,
        Command::Config { action } => commands::config(action, &app_config)?,
    }

    Ok(())
}
