use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use page_webhook::config::Config;
use page_webhook::forward::{DEFAULT_CAPACITY, ForwardQueue, Forwarder, RetryConfig};
use page_webhook::ingest::Ingestor;
use page_webhook::persistence::{PersistenceGateway, open_store};
use page_webhook::server::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "page_webhook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env().context("loading configuration")?);

    let store = open_store(&config.store_uri, &config.store_db, &config.store_collection)
        .with_context(|| format!("opening store {}", config.store_uri))?;
    let gateway = PersistenceGateway::new(store);

    let mut ingestor = Ingestor::new(config.page_id.clone(), gateway, config.store_timeout);
    if let Some(secret) = &config.app_secret {
        ingestor = ingestor.with_app_secret(secret.as_bytes());
    } else {
        tracing::warn!("APP_SECRET not set, payload signatures are not checked");
    }
    if let Some(url) = &config.forward_url {
        let forwarder = Forwarder::new(
            url.clone(),
            config.forward_api_key.clone(),
            config.forward_timeout,
        )
        .context("building forwarding client")?;
        let (queue, _tasks) = ForwardQueue::spawn(forwarder, RetryConfig::DEFAULT, DEFAULT_CAPACITY);
        ingestor = ingestor.with_forwarding(queue);
        tracing::info!(url = %url, "Comment forwarding enabled");
    }

    let app = build_router(AppState::new(Arc::clone(&config), ingestor));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
