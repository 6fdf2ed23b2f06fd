mod entities;
mod files;
mod grants;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::error::Result as StoreResult;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt};
use crate::types::{EntityKind, EntityRecord};

// Entity routes take the plural collection segment: /samples/{id}, /datasets/{id}

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Entity catalog routes
        .route("/entities", post(entities::create_entity))
        .route("/{collection}/{id}", get(entities::get_entity))
        .route("/{collection}/{id}", put(entities::update_entity))
        .route("/{collection}/{id}", delete(entities::delete_entity))
        // File routes
        .route("/{collection}/{id}/files", get(files::list_files))
        .route(
            "/{collection}/{id}/files/{filename}",
            delete(files::delete_file),
        )
        .route("/{collection}/{id}/folders", get(files::list_folders))
        .route(
            "/{collection}/{id}/deleted-files",
            get(files::list_deleted_files),
        )
        .route(
            "/{collection}/{id}/upload-files",
            get(files::list_upload_files),
        )
        .route("/{collection}/{id}/ingest", post(files::ingest))
        .route("/analysis", post(files::prepare_analysis))
        // Public file grant routes
        .route("/public-files", get(grants::list_public_files))
        .route(
            "/{collection}/{id}/public-files",
            post(grants::create_public_file),
        )
        .route(
            "/{collection}/{id}/public-files",
            delete(grants::delete_public_file),
        )
}

fn parse_collection(collection: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_collection(collection)
        .ok_or_else(|| ApiError::not_found(format!("Unknown collection: {collection}")))
}

fn load_entity(state: &AppState, collection: &str, id: &str) -> Result<EntityRecord, ApiError> {
    let kind = parse_collection(collection)?;
    state
        .store
        .get_entity(kind, id)
        .map_err(|_| ApiError::internal("Failed to get entity"))?
        .or_not_found("Entity not found")
}

/// Runs filesystem work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("Worker failed: {e}")))?
        .map_err(ApiError::from)
}
