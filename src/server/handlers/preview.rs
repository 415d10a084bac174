//! Preview handlers: render a template to PNG.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::context::RendererContext;
use crate::document::Template;
use crate::raster::render_png;

use super::super::state::AppState;
use super::api_error;

/// Which view to draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    /// Print view.
    #[default]
    Preview,
    /// Editing view with element outlines.
    Edit,
}

fn default_scale() -> f32 {
    1.0
}

/// Query parameters shared by both preview routes.
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub mode: PreviewMode,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

/// Request body for POST /api/preview.
#[derive(Debug, Deserialize)]
pub struct InlinePreview {
    pub template: Template,
    #[serde(default)]
    pub context: Option<RendererContext>,
}

const MAX_SCALE: f32 = 4.0;

async fn png_response(
    state: &AppState,
    template: &Template,
    context: Option<&RendererContext>,
    query: &PreviewQuery,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !(query.scale > 0.0 && query.scale <= MAX_SCALE) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("scale must be in (0, {}]", MAX_SCALE),
        ));
    }
    let png_bytes = render_png(
        &state.resolver,
        template,
        context,
        query.mode == PreviewMode::Preview,
        query.scale,
    )
    .await
    .map_err(api_error)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png_bytes))
}

/// POST /api/templates/:id/preview - Render a stored template.
///
/// The body, if any, is the render context; without one, samples are shown.
pub async fn stored(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
    context: Option<Json<RendererContext>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let template = state.store.load(&id).await.map_err(api_error)?;
    let context = context.map(|Json(ctx)| ctx);
    png_response(&state, &template, context.as_ref(), &query).await
}

/// POST /api/preview - Render a template sent inline.
pub async fn inline(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
    Json(req): Json<InlinePreview>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    png_response(&state, &req.template, req.context.as_ref(), &query).await
}
