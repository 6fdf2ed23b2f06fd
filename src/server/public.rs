use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::server::AppState;
use crate::types::EntityKind;

/// Anonymous downloads of granted files.
///
/// Any denial or failure is a bare 404 so responses never reveal whether an
/// entity, a grant or a file exists.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sample-file/{name}/{*filename}", get(sample_file))
        .route("/dataset-file/{name}/{*filename}", get(dataset_file))
}

async fn sample_file(
    State(state): State<Arc<AppState>>,
    Path((name, filename)): Path<(String, String)>,
) -> Response {
    serve(state, EntityKind::Sample, name, filename).await
}

async fn dataset_file(
    State(state): State<Arc<AppState>>,
    Path((name, filename)): Path<(String, String)>,
) -> Response {
    serve(state, EntityKind::Dataset, name, filename).await
}

async fn serve(state: Arc<AppState>, kind: EntityKind, name: String, filename: String) -> Response {
    match open(state, kind, &name, filename).await {
        Some(response) => response,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn open(
    state: Arc<AppState>,
    kind: EntityKind,
    name: &str,
    filename: String,
) -> Option<Response> {
    let public = state.public.clone();
    let entity_name = name.to_string();
    let path: PathBuf = tokio::task::spawn_blocking(move || {
        public.resolve_public_file(kind, &entity_name, &filename)
    })
    .await
    .ok()?
    .inspect_err(|e| debug!("public {kind} file for {name} denied: {e}"))
    .ok()?;

    let file = tokio::fs::File::open(&path).await.ok()?;
    let size = file.metadata().await.ok()?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    let disposition = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| {
            let n = n.replace('"', "_");
            HeaderValue::from_str(&format!("attachment; filename=\"{n}\"")).ok()
        })
        .unwrap_or_else(|| HeaderValue::from_static("attachment"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .ok()
}
