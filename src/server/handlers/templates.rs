//! Template CRUD handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::document::{self, ElementTypeMeta, Template};

use super::super::state::AppState;
use super::api_error;

/// GET /api/element-types - Palette of addable element kinds.
pub async fn element_types() -> Json<Vec<ElementTypeMeta>> {
    Json(document::element_types())
}

/// GET /api/templates - All stored templates.
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Template>>, (StatusCode, String)> {
    state.store.list().await.map(Json).map_err(api_error)
}

/// POST /api/templates - Store a new template. Any id in the body is replaced.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(mut template): Json<Template>,
) -> Result<(StatusCode, Json<Template>), (StatusCode, String)> {
    template.id = None;
    let saved = state.store.save(template).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/templates/:id
pub async fn load(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Template>, (StatusCode, String)> {
    state.store.load(&id).await.map(Json).map_err(api_error)
}

/// PUT /api/templates/:id - Replace a template (last write wins).
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut template): Json<Template>,
) -> Result<Json<Template>, (StatusCode, String)> {
    template.id = Some(id);
    state.store.save(template).await.map(Json).map_err(api_error)
}

/// DELETE /api/templates/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.store.delete(&id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for cloning.
#[derive(Debug, Default, Deserialize)]
pub struct CloneRequest {
    pub name: Option<String>,
}

/// POST /api/templates/:id/clone - Store a copy with fresh ids.
///
/// The copy is named `"<name> (Copy)"` unless a name is given.
pub async fn clone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<CloneRequest>>,
) -> Result<(StatusCode, Json<Template>), (StatusCode, String)> {
    let source = state.store.load(&id).await.map_err(api_error)?;
    let name = body
        .and_then(|Json(req)| req.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("{} (Copy)", source.name));
    let saved = state
        .store
        .save(source.clone_as(name))
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(saved)))
}
