use anyhow::Context;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use corner_api::{
    build_state,
    config::Config,
    db::{self, redis::spawn_redis_publisher, MemoryStore, Notifier, PgStore},
    routes::create_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("corner_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.bind_address(),
        "Starting corner-api"
    );

    // Change events
    let (notifier, publisher) = match &config.redis_url {
        Some(url) => {
            let client = db::create_redis_client(url)?;
            let (notifier, events_rx) = Notifier::channel();
            tracing::info!("Publishing corner events to Redis");
            (notifier, Some(spawn_redis_publisher(client, events_rx)))
        }
        None => {
            tracing::info!("REDIS_URL not set, corner events are only logged");
            (Notifier::disabled(), None)
        }
    };

    let invite_ttl = config.invite_ttl()?;
    let state = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db::run_migrations(&pool).await?;
            tracing::info!("Connected to PostgreSQL");
            build_state(PgStore::new(pool), notifier, invite_ttl)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory and lost on exit");
            build_state(MemoryStore::new(), notifier, invite_ttl)
        }
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(publisher) = publisher {
        publisher.shutdown().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl-C, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        },
    }
}
