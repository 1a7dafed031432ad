//! vellum-of - Order Fulfillment service
//!
//! Turns paid orders into personalized multi-chapter ebooks: sale webhooks
//! create orders, customers answer tier-scaled diagnostic questions, and the
//! fulfillment pipeline generates chapters, illustrations and bonus assets
//! through the Gemini API, persisting progress after every chapter so
//! interrupted runs resume without losing work.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vellum_common::events::EventBus;
use vellum_of::config;
use vellum_of::db::{self, OrderStore};
use vellum_of::services::{ContentProvider, GeminiClient, Notifier};
use vellum_of::AppState;

/// Command-line arguments for vellum-of
#[derive(Parser, Debug)]
#[command(name = "vellum-of")]
#[command(about = "Order fulfillment service for Vellum")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5860", env = "VELLUM_OF_PORT")]
    port: u16,

    /// Path to the TOML config file
    #[arg(short, long, env = "VELLUM_OF_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the orders database (also VELLUM_OF_DATABASE)
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vellum_of=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting vellum-of (Order Fulfillment) service");
    info!(
        "Version: {} ({} built {} as {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    // Resolve configuration: CLI > environment > TOML > defaults
    let toml_config = config::load_toml_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    let service_config =
        config::resolve(args.database.as_deref(), &toml_config).context("Invalid configuration")?;

    // Event bus for store notifications and SSE broadcasting
    let event_bus = EventBus::new(100);

    // Open the order store, degrading to a non-durable mode when the
    // database is unavailable rather than refusing to start
    let store = match &service_config.database {
        Some(db_path) => {
            info!("Database: {}", db_path.display());
            match db::init_database_pool(db_path).await {
                Ok(pool) => OrderStore::new(pool, event_bus.clone()),
                Err(e) => {
                    warn!(error = %e, "Could not open database, orders will not persist");
                    OrderStore::degraded(event_bus.clone())
                }
            }
        }
        None => {
            warn!("No database path resolved, orders will not persist");
            OrderStore::degraded(event_bus.clone())
        }
    };

    // Content provider; a usable API key is required to start
    let provider: Arc<dyn ContentProvider> = Arc::new(
        GeminiClient::new(&service_config.provider).context("Failed to build Gemini client")?,
    );

    // Marketing notifier; runs in mock mode without platform keys
    let notifier = Arc::new(
        Notifier::new(service_config.mailer, service_config.community)
            .context("Failed to build notifier")?,
    );

    let state = AppState::new(store, provider, notifier, event_bus);
    let app = vellum_of::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
