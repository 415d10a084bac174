//! # Error Types
//!
//! This module defines error types used throughout the reportcard library.

use thiserror::Error;

/// Main error type for reportcard operations
#[derive(Debug, Error)]
pub enum ReportCardError {
    /// Invalid template or element operation
    #[error("Template error: {0}")]
    Template(String),

    /// A template or element id that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bulk generation could not resolve any template
    #[error("No report card template available")]
    NoTemplate,

    /// Roster / academic data fetch failure
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Image download or decode failure
    #[error("Image error: {0}")]
    Image(String),

    /// Rasterization failure
    #[error("Render error: {0}")]
    Render(String),

    /// PNG/PDF assembly failure
    #[error("Export error: {0}")]
    Export(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
