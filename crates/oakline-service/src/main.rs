//! Entry point for the Oakline portal service binary.

#![deny(unsafe_code)]

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oakline_core::StorageConfig;
use oakline_service::{build_router, ServiceConfig, ServiceState};

#[derive(Debug, Parser)]
#[command(name = "oakline-service", version, about = "Oakline investor portal API")]
struct Cli {
    /// Address the HTTP service binds to.
    #[arg(long, default_value = "127.0.0.1:8642", env = "OAKLINE_BIND")]
    bind: SocketAddr,

    /// Storage backend. `auto` picks postgres when a database URL is set and
    /// falls back to memory otherwise.
    #[arg(long, value_enum, default_value = "auto", env = "OAKLINE_STORAGE_MODE")]
    storage_mode: StorageMode,

    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Connection cap for the PostgreSQL pool.
    #[arg(long, default_value_t = 8, env = "OAKLINE_DB_MAX_CONNECTIONS")]
    db_max_connections: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StorageMode {
    Auto,
    Memory,
    Postgres,
}

fn resolve_storage(cli: &Cli) -> anyhow::Result<StorageConfig> {
    match cli.storage_mode {
        StorageMode::Memory => Ok(StorageConfig::memory()),
        StorageMode::Postgres => {
            let Some(url) = cli.database_url.clone() else {
                anyhow::bail!("postgres storage requires --database-url or DATABASE_URL");
            };
            Ok(StorageConfig::postgres(url, cli.db_max_connections))
        }
        StorageMode::Auto => Ok(match cli.database_url.clone() {
            Some(url) => StorageConfig::postgres(url, cli.db_max_connections),
            None => StorageConfig::memory(),
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("oakline_core=info,oakline_service=info,tower_http=info")
        }))
        .init();

    let storage = resolve_storage(&cli)?;
    info!(backend = storage.label(), "starting oakline portal service");

    let state = ServiceState::bootstrap(ServiceConfig { storage })
        .await
        .context("storage bootstrap failed")?;
    let router = build_router(state);

    let listener = TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(addr = %cli.bind, "listening");
    axum::serve(listener, router)
        .await
        .context("server exited")?;
    Ok(())
}
