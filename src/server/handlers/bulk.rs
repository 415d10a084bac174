//! Bulk generation handler.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::bulk::{BulkRequest, TermInfo};
use crate::context::SchoolInfo;

use super::super::state::AppState;
use super::api_error;

/// Request body for POST /api/bulk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkBody {
    pub class_id: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub school: SchoolInfo,
    #[serde(default)]
    pub term: TermInfo,
}

/// POST /api/bulk - Generate the class PDF as a download.
///
/// Any batch-level failure is reported as one error message.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let templates = state.store.list().await.map_err(api_error)?;
    let request = BulkRequest {
        class_name: body.class_name.unwrap_or_else(|| body.class_id.clone()),
        class_id: body.class_id,
        template_id: body.template_id,
        school: body.school,
        term: body.term,
    };

    let output = state
        .generator
        .generate(&templates, &request, &|p| {
            tracing::debug!(current = p.current, total = p.total, student = %p.student_name, "bulk progress");
        })
        .await
        .map_err(api_error)?;

    let disposition = format!("attachment; filename=\"{}\"", output.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.pdf,
    ))
}
