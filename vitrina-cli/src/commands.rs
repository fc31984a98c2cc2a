use std::path::Path;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info};
use vitrina_engine::{
    CacheWorker, Destination, FetchOutcome, LoggingHost, Request, VersionTag, WorkerConfig, inject_version,
};

use crate::cli::{ConfigAction, FetchArgs, StampArgs};
use crate::config::AppConfig;
use crate::error::AppError;

async fn open_worker(config: WorkerConfig) -> Result<CacheWorker, AppError> {
    let worker = CacheWorker::from_config(config, Arc::new(LoggingHost)).await?;
    debug!(?worker, "Worker ready");
    Ok(worker)
}

/// Inject a version into a worker source file and return the version used
pub fn stamp(args: &StampArgs) -> Result<VersionTag, AppError> {
    let version = match &args.tag {
        Some(tag) => VersionTag::new(tag.as_str())?,
        None => VersionTag::generate(),
    };

    let source = std::fs::read_to_string(&args.input)?;
    let stamped = inject_version(&source, &version)?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, stamped)?;

    info!(input = ?args.input, output = ?args.output, %version, "Stamped worker source");
    Ok(version)
}

pub async fn install(config: WorkerConfig) -> Result<(), AppError> {
    let worker = open_worker(config).await?;
    let evicted = worker.start().await?;

    println!("Installed {} ({:?})", worker.names().version(), worker.state());
    if evicted.is_empty() {
        println!("No stale partitions");
    }
    for name in evicted {
        println!("Evicted {name}");
    }
    Ok(())
}

pub fn parse_destination(value: &str) -> Result<Destination, AppError> {
    value.parse().map_err(AppError::InvalidInput)
}

pub fn parse_method(value: &str) -> Result<Method, AppError> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes())
        .map_err(|_| AppError::invalid_input(format!("invalid HTTP method '{value}'")))
}

pub async fn fetch(config: WorkerConfig, args: &FetchArgs) -> Result<(), AppError> {
    let url = config.resolve(&args.url)?;
    let request = Request::new(parse_method(&args.method)?, url, parse_destination(&args.destination)?);

    let worker = open_worker(config).await?;
    let outcome = worker.handle_fetch(&request).await;
    // Let background revalidation finish before the process exits
    worker.settle().await;

    match outcome {
        FetchOutcome::Passthrough => {
            println!("{} {} is not handled by the worker", request.method, request.url);
        }
        FetchOutcome::Respond(response) => {
            println!(
                "{} {} ({} bytes)",
                response.status,
                response.status_text,
                response.body.len()
            );
            if let Some(path) = &args.output {
                write_body(path, &response.body).await?;
                println!("Body written to {}", path.display());
            }
        }
    }
    Ok(())
}

async fn write_body(path: &Path, body: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await?;
    Ok(())
}

pub async fn sync(config: WorkerConfig, tag: Option<String>) -> Result<(), AppError> {
    let tag = tag.unwrap_or_else(|| config.sync_tag.clone());
    let worker = open_worker(config).await?;

    let refreshed = worker.handle_sync(&tag).await?;
    println!("Refreshed {refreshed} image entries");
    Ok(())
}

pub async fn push(config: WorkerConfig, payload: Option<String>) -> Result<(), AppError> {
    let worker = open_worker(config).await?;

    let notification = worker.handle_push(payload.as_deref().map(str::as_bytes)).await?;
    println!("{}", serde_json::to_string_pretty(&notification)?);
    Ok(())
}

pub async fn message(config: WorkerConfig, json: &str) -> Result<(), AppError> {
    let data: Value = serde_json::from_str(json)?;
    let worker = open_worker(config).await?;

    let (tx, rx) = oneshot::channel();
    worker.handle_message(data, Some(tx)).await?;

    match rx.await {
        Ok(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
        Err(_) => println!("(no reply)"),
    }
    Ok(())
}

pub async fn partitions(config: WorkerConfig) -> Result<(), AppError> {
    let worker = open_worker(config).await?;
    let storage = worker.storage();
    let names = storage.keys();

    if names.is_empty() {
        println!("No partitions");
        return Ok(());
    }

    for name in names {
        let Some(partition) = storage.get(&name) else {
            continue;
        };
        let entries = partition.entry_count().await?;
        let marker = if worker.names().contains(&name) {
            "current"
        } else if worker.names().is_stale(&name) {
            "stale"
        } else {
            "foreign"
        };
        println!("{name:<40} {entries:>6} entries  [{marker}]");
    }
    Ok(())
}

pub fn config(action: ConfigAction, config: &AppConfig) -> Result<(), AppError> {
    match action {
        ConfigAction::Show => print!("{}", config.show()?),
        ConfigAction::Path => match AppConfig::default_config_path() {
            Some(path) => println!("{}", path.display()),
            None => return Err(AppError::invalid_input("no configuration directory on this platform")),
        },
    }
    Ok(())
}
