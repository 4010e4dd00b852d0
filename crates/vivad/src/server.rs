//! HTTP server for vivad

use crate::document::DocumentExtractor;
use crate::examiner::Examiner;
use crate::routes;
use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub examiner: Examiner,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(examiner: Examiner, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self {
            examiner,
            extractor,
            start_time: Instant::now(),
        }
    }
}

/// Assemble the router with body limit and request tracing.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(routes::exam_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(app: Router, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("  Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
