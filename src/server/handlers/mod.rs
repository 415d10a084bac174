//! HTTP handlers for the server.

pub mod bulk;
pub mod preview;
pub mod templates;

use axum::http::StatusCode;

use crate::error::ReportCardError;

/// Map a library error to a status code and message.
pub(super) fn api_error(e: ReportCardError) -> (StatusCode, String) {
    let status = match &e {
        ReportCardError::NotFound(_) => StatusCode::NOT_FOUND,
        ReportCardError::Template(_) | ReportCardError::Json(_) => StatusCode::BAD_REQUEST,
        ReportCardError::NoTemplate => StatusCode::UNPROCESSABLE_ENTITY,
        ReportCardError::Fetch(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    (status, e.to_string())
}
