use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Local;
use tracing::info;

use super::{blocking, load_entity};
use crate::auth::RequireAdmin;
use crate::files::{keep_filename, public_file_url};
use crate::server::AppState;
use crate::server::dto::{
    AnalysisRequest, AnalysisResponse, FileResponse, FoldersQuery, IngestResponse,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};

pub async fn list_files(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let worker = Arc::clone(&state);
    let responses = blocking(move || {
        let files = worker.files.files(&entity);
        let mut responses = Vec::with_capacity(files.len());
        for path in files {
            let public = worker.public.is_public(&entity, &path)?;
            let relative = worker.files.relativize(&entity, &path);
            let public_url = public.then(|| {
                public_file_url(
                    worker.public_base_url.as_deref(),
                    entity.kind,
                    &entity.name,
                    &relative.to_string_lossy().replace('\\', "/"),
                )
            });
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            responses.push(FileResponse {
                path,
                filename,
                public,
                public_url,
            });
        }
        Ok(responses)
    })
    .await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(responses)))
}

pub async fn list_folders(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<FoldersQuery>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let files = Arc::clone(&state.files);
    let labels = blocking(move || Ok(files.folder_labels(&entity, query.unix))).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(labels)))
}

pub async fn list_deleted_files(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let files = Arc::clone(&state.files);
    let deleted = blocking(move || Ok(files.deleted_files(&entity))).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(deleted)))
}

pub async fn delete_file(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id, filename)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let files = Arc::clone(&state.files);
    let record = blocking(move || files.delete_file(&entity, &PathBuf::from(filename))).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(record)))
}

pub async fn list_upload_files(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let files = Arc::clone(&state.files);
    let staged = blocking(move || Ok(files.upload_files(&entity))).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(staged)))
}

/// Starts moving the entity's staged uploads into its home folder.
///
/// Answers as soon as the batch is scheduled; progress goes to the log.
pub async fn ingest(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let files = Arc::clone(&state.files);
    let lookup = entity.clone();
    let staged = blocking(move || Ok(files.upload_files(&lookup))).await?;
    let count = staged.len();

    let name = entity.name.clone();
    // Detached: the blocking worker runs to completion or first failure.
    let _ingestion = state
        .files
        .ingest(&entity, staged, keep_filename, move |file, fraction| {
            if !file.is_empty() {
                info!("ingesting {file} for {name} ({:.0}%)", fraction * 100.0);
            }
        });

    Ok::<_, ApiError>((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(IngestResponse { staged: count })),
    ))
}

/// Gathers the files of several entities into one analysis folder.
pub async fn prepare_analysis(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalysisRequest>,
) -> impl IntoResponse {
    let mut entities = Vec::with_capacity(req.ids.len());
    for id in &req.ids {
        let entity = state
            .store
            .get_entity(req.kind, id)?
            .or_not_found("Entity not found")?;
        entities.push(entity);
    }

    let files = Arc::clone(&state.files);
    let actor = req.actor;
    let response = blocking(move || {
        let today = Local::now().date_naive();
        let actor = actor.as_deref();
        let folder = files.prepare_analysis(&entities, actor, today)?;
        let analysis = files.drives().analysis();
        Ok(AnalysisResponse {
            folder,
            windows_label: analysis.bundle_label(&entities, actor, today, false)?,
            unix_label: analysis.bundle_label(&entities, actor, today, true)?,
        })
    })
    .await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

