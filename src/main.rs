use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bookshelf_api::config::{self, AppConfig};
use bookshelf_api::database::{BookStore, MemoryBookStore, PgBookStore};
use bookshelf_api::{app, AppState};

#[derive(Parser)]
#[command(name = "bookshelf-api")]
#[command(about = "Book records API with per-user row scoping behind HTTP Basic auth")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Address to bind (overrides BOOKSHELF_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides BOOKSHELF_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Postgres connection URL (overrides DATABASE_URL)")]
    database_url: Option<String>,

    #[arg(long, help = "Keep books in memory even if a database URL is configured")]
    memory: bool,
}

impl Cli {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = Some(url);
        }
        if self.memory {
            config.database.url = None;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_USERS, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookshelf_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.apply(config::config().clone());
    tracing::info!("Starting Bookshelf API in {:?} mode", config.environment);

    let pg = match &config.database.url {
        Some(_) => {
            let pg = PgBookStore::connect(&config.database)
                .await
                .context("failed to connect to book database")?;
            pg.migrate().await.context("failed to prepare book table")?;
            Some(pg)
        }
        None => {
            tracing::warn!("No DATABASE_URL configured; books are kept in memory");
            None
        }
    };
    let store: Arc<dyn BookStore> = match &pg {
        Some(pg) => Arc::new(pg.clone()),
        None => Arc::new(MemoryBookStore::new()),
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Bookshelf API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pg) = pg {
        pg.close().await;
    }

    tracing::info!("Bookshelf API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
