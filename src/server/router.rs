use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::public::public_router;
use crate::drive::Drives;
use crate::files::{FileService, PublicFiles};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub files: Arc<FileService>,
    pub public: PublicFiles,
    /// Public base URL for external access. Used to render public file links.
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, drives: Drives, public_base_url: Option<String>) -> Self {
        let files = Arc::new(FileService::new(Arc::new(drives)));
        let public = PublicFiles::new(Arc::clone(&files), Arc::clone(&store));
        Self {
            store,
            files,
            public,
            public_base_url,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", admin_router())
        .merge(public_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
