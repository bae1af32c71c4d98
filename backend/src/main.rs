//! Backend entry-point: loads settings, wires storage and runs one command.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mockable::DefaultClock;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use research_backend::domain::TraceId;
use research_backend::inbound::ResponseEnvelope;
use research_backend::inbound::cli::{Cli, execute};
use research_backend::outbound::notifier::LogNotifier;
use research_backend::outbound::persistence::{DbPool, PoolConfig};
use research_backend::settings::Settings;
use research_backend::{Backend, Storage};

fn main() -> io::Result<ExitCode> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(TraceId::scope(TraceId::generate(), async_main()))
}

async fn async_main() -> io::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load().map_err(io::Error::other)?;
    let storage = resolve_storage(settings.database.pool_config(cli.database_url.clone())).await?;

    let backend = Backend::build(
        settings,
        &storage,
        Arc::new(LogNotifier),
        Arc::new(DefaultClock),
    )
    .map_err(|error| io::Error::other(format!("wire backend: {error}")))?;
    if matches!(storage, Storage::Postgres(_)) {
        let indexed = backend.auth.reindex_search().await.map_err(io::Error::other)?;
        info!(indexed, "search index warmed");
    }

    let envelope = match execute(cli.command, &backend).await {
        Ok(envelope) => envelope,
        Err(error) => ResponseEnvelope::from(&error),
    };
    let body = serde_json::to_string_pretty(&envelope)
        .map_err(|error| io::Error::other(format!("serialise response: {error}")))?;
    println!("{body}");

    Ok(if envelope.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn resolve_storage(pool_config: Option<PoolConfig>) -> io::Result<Storage> {
    let Some(config) = pool_config else {
        warn!("DATABASE_URL not set; using process-local storage");
        return Ok(Storage::Memory);
    };
    let pool = DbPool::new(config)
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    Ok(Storage::Postgres(pool))
}
