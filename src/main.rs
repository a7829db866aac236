mod config;
mod error;
mod llm;
mod routes;
mod services;
mod session;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = config::ServerConfig::from_env().expect("invalid server config");

    // Non-fatal: without an LLM every reply settles as a failure.
    let llm = match init_llm() {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; replies disabled");
            None
        }
    };

    let state = state::AppState::new(llm);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .expect("failed to bind");

    tracing::info!(addr = %server.addr, "raycare-chat listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

fn init_llm() -> Result<Arc<dyn llm::LlmChat>, llm::types::LlmError> {
    let config = llm::LlmConfig::from_env()?;
    let (provider, model) = (config.provider, config.model.clone());
    let client = llm::connect(config)?;
    tracing::info!(?provider, %model, "LLM client initialized");
    Ok(client)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
