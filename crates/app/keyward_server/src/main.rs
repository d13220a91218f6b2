//! Keyward credential service server binary.
//!
//! Configuration comes from the environment (optionally via `.env`) and CLI
//! flags. Logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use keyward_api::AppState;
use keyward_core::auth::service::CredentialService;
use keyward_core::auth::settings::JwtSettings;
use keyward_core::store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "keyward_server", about = "Keyward credential service")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL. Without one, identities live in memory
    /// and are lost on exit.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,keyward_api=debug,keyward_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Configuration faults stop startup before anything binds.
    let settings = JwtSettings::from_env().map_err(|e| format!("invalid configuration: {e}"))?;

    info!(
        issuer = %settings.issuer,
        audience = %settings.audience,
        access_minutes = settings.access_token_expiration_minutes,
        "starting keyward_server"
    );

    let store: Arc<dyn CredentialStore> = match &args.database_url {
        Some(url) => {
            info!(max_connections = args.max_connections, "connecting to postgres");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            keyward_core::migrate::migrate(&pool).await?;
            Arc::new(PgCredentialStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let service = CredentialService::new(store, &settings)
        .map_err(|e| format!("invalid configuration: {e}"))?;
    let app = keyward_api::router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&args.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
