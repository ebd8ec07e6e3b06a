use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kestrel_api::config::{AppConfig, StorageBackend};
use kestrel_api::{app, database, AppState};

#[derive(Parser)]
#[command(name = "kestrel-api")]
#[command(about = "Kestrel API - shared game catalogue server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH0_DOMAIN, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kestrel_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = kestrel_api::config::config().clone();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Migrate => migrate(&config).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    info!("Starting Kestrel API in {:?} mode", config.environment);

    let state = AppState::from_config(&config).await?;
    let router = app(state, &config.server);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Kestrel API listening on http://{}", bind_addr);
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    if config.storage.backend != StorageBackend::Postgres {
        info!("Storage backend is {:?}, nothing to migrate", config.storage.backend);
        return Ok(());
    }

    let pool = database::connect(&config.storage).await?;
    database::migrate(&pool).await?;
    Ok(())
}
