//! Server state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use crate::bulk::{AcademicSource, BulkConfig, BulkGenerator};
use crate::raster::{ImageResolver, ResolverConfig};
use crate::store::TemplateStore;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory for template JSON files. `None` keeps templates in memory.
    pub templates_dir: Option<PathBuf>,
    /// Base URL of the academic records backend.
    pub data_url: Option<String>,
    /// Fixture file used instead of a backend.
    pub fixture: Option<PathBuf>,
    pub bulk: BulkConfig,
    /// Image sources templates may use. Public HTTP(S) only by default.
    pub images: ResolverConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            templates_dir: None,
            data_url: None,
            fixture: None,
            bulk: BulkConfig::default(),
            images: ResolverConfig::default(),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub store: Arc<dyn TemplateStore>,
    pub resolver: ImageResolver,
    pub generator: BulkGenerator,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        source: Arc<dyn AcademicSource>,
        resolver: ImageResolver,
        bulk: BulkConfig,
    ) -> Self {
        Self {
            store,
            generator: BulkGenerator::new(source, resolver.clone(), bulk),
            resolver,
        }
    }
}
