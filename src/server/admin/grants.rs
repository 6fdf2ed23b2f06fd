use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use super::load_entity;
use crate::auth::RequireAdmin;
use crate::files::public_file_url;
use crate::server::AppState;
use crate::server::dto::{GrantRequest, PublicFileResponse, RevokeRequest, RevokeResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::PublicFileGrant;

fn grant_to_response(
    state: &AppState,
    grant: PublicFileGrant,
) -> Result<PublicFileResponse, ApiError> {
    let entity = state
        .store
        .get_entity(grant.entity_kind, &grant.entity_id)
        .map_err(|_| ApiError::internal("Failed to get entity"))?;

    let url = entity.as_ref().map(|entity| {
        public_file_url(
            state.public_base_url.as_deref(),
            entity.kind,
            &entity.name,
            &grant.path,
        )
    });

    Ok(PublicFileResponse {
        entity_kind: grant.entity_kind,
        entity_id: grant.entity_id,
        entity_name: entity.map(|entity| entity.name),
        path: grant.path,
        expiry_date: grant.expiry_date,
        url,
    })
}

/// Grants that are still valid today.
pub async fn list_public_files(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let grants = state
        .public
        .list_active_grants()
        .map_err(|_| ApiError::internal("Failed to list public files"))?;

    let responses: Vec<PublicFileResponse> = grants
        .into_iter()
        .map(|grant| grant_to_response(&state, grant))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(responses)))
}

pub async fn create_public_file(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(req): Json<GrantRequest>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let grant = state.public.grant(&entity, &req.path, req.expiry_date)?;
    let response = grant_to_response(&state, grant)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

pub async fn delete_public_file(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(req): Json<RevokeRequest>,
) -> impl IntoResponse {
    let entity = load_entity(&state, &collection, &id)?;

    let revoked = state.public.revoke(&entity, &req.path)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(RevokeResponse { revoked })))
}
