use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use chat_memory_server::config::Settings;
use chat_memory_server::database::{DbPool, PgConversationStore};
use chat_memory_server::handlers;
use chat_memory_server::services::conversation::{ContextBuilder, ConversationManager};
use chat_memory_server::services::{GenerationBackend, OllamaGateway};
use chat_memory_server::state::AppState;
use chat_memory_server::utils::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    // Dropped at the end of main, after the last log line
    let _log_guard = init_logger()?;

    info!("Starting chat memory server...");

    // Invalid configuration is fatal
    let settings = Settings::load()?;
    info!("Configuration loaded");

    let db_pool = DbPool::new(&settings.database).await?;
    info!("Database connection established");

    let store = Arc::new(PgConversationStore::new(db_pool.clone()));
    store.ensure_schema().await?;

    let gateway = Arc::new(OllamaGateway::new(&settings.llm)?);
    let health = gateway.health_check().await;
    if !health.available {
        warn!(
            "LLM backend at {} is unavailable, starting degraded",
            gateway.base_url()
        );
    }

    let conversation_manager = Arc::new(ConversationManager::new(
        store,
        gateway,
        ContextBuilder::new(settings.conversation.max_context_turns),
    ));

    let app = handlers::router(AppState {
        conversation_manager,
        conversation: settings.conversation.clone(),
    });

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
