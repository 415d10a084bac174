//! # Reportcard - Report Card Template Engine
//!
//! Reportcard lets schools design report card templates from positioned
//! elements and fill them with student data. It provides:
//!
//! - **Element model**: typed elements with layering, duplication and presets
//! - **Placeholders**: `[Student Name]`-style tokens with sample fallbacks
//! - **Tables**: grade, attendance, behavior and grading-scale generators
//! - **Rendering**: page layout, PNG rasterization and multi-page PDF export
//! - **Editor shell**: selection, dragging, snapping, zoom and keyboard handling
//! - **Bulk generation**: one PDF page per student of a class
//!
//! ## Quick Start
//!
//! ```no_run
//! use reportcard::{
//!     context::RendererContext,
//!     document::Template,
//!     raster::{ImageResolver, render_png},
//! };
//!
//! # async fn example() -> Result<(), reportcard::ReportCardError> {
//! let mut template = Template::new("Standard");
//! template.add_element("school_name")?;
//! template.add_element("student_name")?;
//! template.add_element("grade_table")?;
//!
//! let ctx: RendererContext =
//!     serde_json::from_str(r#"{"school": {"schoolName": "Test Academy"}}"#)?;
//!
//! let resolver = ImageResolver::new(reqwest::Client::new());
//! let png = render_png(&resolver, &template, Some(&ctx), true, 1.0).await?;
//! std::fs::write("preview.png", png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Templates, element kinds, presets and editing operations |
//! | [`placeholder`] | Token substitution |
//! | [`tables`] | Table generators |
//! | [`render`] | Element and page rendering |
//! | [`raster`] | Pixels, PNG and PDF |
//! | [`editor`] | Interactive editing state machine |
//! | [`bulk`] | Class-wide PDF generation |
//! | [`store`] | Template persistence |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod bulk;
pub mod context;
pub mod document;
pub mod editor;
pub mod error;
pub mod placeholder;
pub mod raster;
pub mod render;
pub mod server;
pub mod store;
pub mod tables;

// Re-exports for convenience
pub use context::RendererContext;
pub use document::{Template, TemplateElement};
pub use error::ReportCardError;
