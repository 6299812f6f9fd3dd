//! Entry point for the `matchforge-api` server (spec §6).

use std::net::SocketAddr;
use std::sync::Arc;

use matchforge_core::embed::RigEmbedder;
use matchforge_core::llm::RigLlm;
use matchforge_core::store::sqlite::SqliteStore;
use rig::providers::openai;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use matchforge_api::config::Config;
use matchforge_api::extract::PlainTextExtractor;
use matchforge_api::routes;
use matchforge_api::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .json()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(config = %config.redacted_summary(), "configuration loaded");

    let store: Arc<dyn matchforge_core::store::VectorStore> = if config.vector_store_url == ":memory:"
    {
        Arc::new(SqliteStore::open_in_memory().await?)
    } else {
        Arc::new(SqliteStore::open(&config.vector_store_url).await?)
    };

    let openai_client = openai::Client::new(&config.llm_api_key);
    let embedder = Arc::new(RigEmbedder::new(
        openai_client.embedding_model(openai::TEXT_EMBEDDING_3_SMALL),
    ));
    let llm = Arc::new(RigLlm::new(openai_client.completion_model(&config.llm_model)));
    let extractor = Arc::new(PlainTextExtractor);

    let state = AppState::new(store, embedder, llm, extractor);

    let cors = match config.cors_origins() {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<_> = origins
                .into_iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
    };

    let app = routes::app(state, cors);

    let addr: SocketAddr = config.bind_address.parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "matchforge-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}
