use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{blocking, load_entity};
use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    CreateEntityRequest, DriveReportResponse, UpdateEntityRequest, UpdateEntityResponse,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::EntityRecord;

/// Names end up as folder and file name segments.
fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ApiError::bad_request(format!("Invalid name: {name}")));
    }
    Ok(())
}

pub async fn create_entity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEntityRequest>,
) -> impl IntoResponse {
    validate_name(&req.name)?;

    let entity = EntityRecord {
        id: uuid::Uuid::new_v4().to_string(),
        kind: req.kind,
        name: req.name,
        date: req.date,
        creation_date: Utc::now(),
        assay: req.assay,
        alternate_names: req.alternate_names,
    };
    state.store.create_entity(&entity)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(entity))))
}

pub async fn get_entity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(entity)))
}

/// Saves new metadata, then moves the entity's folders to match it.
pub async fn update_entity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(req): Json<UpdateEntityRequest>,
) -> impl IntoResponse {
    let previous = load_entity(&state, &collection, &id)?;
    let updated = req.apply(&previous);
    validate_name(&updated.name)?;

    let store = Arc::clone(&state.store);
    let files = Arc::clone(&state.files);
    let saved = updated.clone();
    let reports = blocking(move || {
        files.save_with_rename(&previous, &saved, || store.update_entity(&saved))
    })
    .await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UpdateEntityResponse {
        entity: updated,
        drives: reports.into_iter().map(DriveReportResponse::from).collect(),
    })))
}

/// Removes the entity, its grants and its folders on home and archive drives.
pub async fn delete_entity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let files = Arc::clone(&state.files);
    let removed = entity.clone();
    blocking(move || files.delete_entity_folders(&removed)).await?;
    state.store.delete_entity(entity.kind, &entity.id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
