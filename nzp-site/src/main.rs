//! nzp-site - NZ Packs scenepack catalog site
//!
//! Serves the catalog API over a local SQLite collection, signs browsers in
//! through the hosted identity provider and pushes live catalog updates.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nzp_common::config::{resolve_database_path, resolve_port, LoggingConfig, SiteConfig};
use nzp_common::events::EventBus;
use nzp_common::identity::IdentityProvider;
use nzp_common::images::{ImageProbe, TrustingProbe};
use nzp_common::mutation::MutationGateway;
use nzp_common::store::CatalogStore;
use nzp_common::view::ViewController;
use nzp_site::db::{self, SqliteCatalogStore};
use nzp_site::identity::HttpIdentityProvider;
use nzp_site::images::HttpImageProbe;
use nzp_site::sessions::SWEEP_INTERVAL;
use nzp_site::{build_router, AppState, SiteSettings, EVENT_BUS_CAPACITY};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for nzp-site
#[derive(Parser, Debug)]
#[command(name = "nzp-site")]
#[command(about = "NZ Packs scenepack catalog site")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "NZP_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "NZP_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "NZP_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config picks the default log filter, so it loads before tracing starts
    let config = SiteConfig::load(args.config.as_deref());
    let level = match &config {
        Ok(c) => c.logging.level.clone(),
        Err(_) => LoggingConfig::default().level,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting NZ Packs site (nzp-site) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = config.context("Failed to load configuration")?;

    let api_key = match config.identity.resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database path: {}", db_path.display());

    let pool = match db::connect(&db_path).await {
        Ok(pool) => {
            info!("✓ Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let store = Arc::new(
        SqliteCatalogStore::open(pool, &config.store.app_id)
            .await
            .context("Failed to open catalog store")?,
    );
    info!("✓ Catalog collection {}", store.collection());

    let events = EventBus::new(EVENT_BUS_CAPACITY);
    let view = Arc::new(ViewController::new(
        events.clone(),
        config.login.redirect_url.clone(),
    ));
    tokio::spawn(view.clone().run_live_query(store.subscribe()));

    let identity: Arc<dyn IdentityProvider> = Arc::new(
        HttpIdentityProvider::new(&config.identity.base_url, api_key)
            .context("Failed to initialize identity provider")?,
    );

    let images: Arc<dyn ImageProbe> = if config.images.probe {
        Arc::new(HttpImageProbe::new(config.images.timeout())?)
    } else {
        info!("Image probing disabled, card images are used as given");
        Arc::new(TrustingProbe)
    };

    let state = AppState::new(
        view,
        MutationGateway::new(store.clone()),
        identity,
        images,
        events,
        SiteSettings::from_config(&config),
    );
    tokio::spawn(state.sessions.clone().run_sweeper(SWEEP_INTERVAL));
    let app = build_router(state);

    let port = resolve_port(args.port, &config);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("nzp-site listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
