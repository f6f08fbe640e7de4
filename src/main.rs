use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use financial_analyzer::{
    agents::ExecutionSettings,
    cache::ResultCache,
    config::Config,
    crew::Crew,
    document::PdfDocumentLoader,
    llm::{LLMProviderConfig, LLM},
    routes::create_router,
    storage::ScratchStore,
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so logging can honour LOG_DIR and LOG_FORMAT
    let config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);
    info!("LLM configuration: {:?}", config.llm);

    let llm = LLM::new(LLMProviderConfig::from(&config.llm))?;
    let crew = Crew::financial(
        llm,
        ExecutionSettings::from(&config.llm),
        Arc::new(PdfDocumentLoader::new()),
    )?;
    info!(order = ?crew.execution_order(), "Crew assembled");

    let state = AppState::new(
        crew,
        ResultCache::new(config.cache.capacity),
        ScratchStore::new(config.storage.data_dir.clone()),
    )
    .with_upload_limit(config.server.max_upload_bytes)
    .with_cors_origins(config.server.cors_allowed_origins.clone());

    let app = create_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    state.results.clear().await;
    info!("Server stopped, result cache cleared");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
