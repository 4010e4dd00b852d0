//! Viva Daemon - oral exam simulator backed by an LLM
//!
//! Serves the start/answer/upload API and grades answers upstream.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viva_common::{CredentialPool, GeminiBackend, RotatingClient, VERSION};
use vivad::config::VivaConfig;
use vivad::document::PdfExtractor;
use vivad::examiner::Examiner;
use vivad::server::{self, AppState};
use vivad::session::MemorySessionStore;

/// How often idle sessions are swept
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Viva Daemon v{} starting", VERSION);

    let config = VivaConfig::load();
    let pool = CredentialPool::from_env().context("Cannot start without API keys")?;
    info!("  {} API keys loaded, model {}", pool.len(), config.llm.model);

    let backend = Arc::new(
        GeminiBackend::new(&config.llm.endpoint, config.llm.timeout())
            .context("Cannot create the Gemini HTTP client")?,
    );
    let client = RotatingClient::new(backend, Arc::new(pool), config.llm.model.clone())
        .with_rotation_delay(config.llm.rotation_delay());

    let store = Arc::new(MemorySessionStore::new(
        config.exam.session_ttl_secs,
        config.exam.max_sessions,
    ));
    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.purge_expired().await;
        }
    });

    let examiner = Examiner::new(client, store, config.exam_settings());
    let extractor = Arc::new(PdfExtractor::new(config.exam.max_pages));
    let app = server::build_router(
        AppState::new(examiner, extractor),
        config.server.max_upload_bytes,
    );

    server::run(app, &config.server.bind_addr).await
}
