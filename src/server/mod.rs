//! # HTTP Server for Report Card Templates
//!
//! JSON API for managing templates, rendering previews and generating class
//! PDFs.
//!
//! ## Usage
//!
//! ```bash
//! reportcard serve --listen 0.0.0.0:8080 --templates-dir ./templates \
//!     --data-url https://school.example/api
//! ```
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /api/element-types` | Element palette |
//! | `GET/POST /api/templates` | List / create |
//! | `GET/PUT/DELETE /api/templates/:id` | Load / save / delete |
//! | `POST /api/templates/:id/clone` | Copy under a new name |
//! | `POST /api/templates/:id/preview` | Stored template as PNG |
//! | `POST /api/preview` | Inline template as PNG |
//! | `POST /api/bulk` | Class PDF download |

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::bulk::{AcademicSource, FixtureSource, HttpAcademicSource};
use crate::error::ReportCardError;
use crate::raster::ImageResolver;
use crate::store::{FileTemplateStore, MemoryTemplateStore, TemplateStore};

/// Build the API router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/element-types", get(handlers::templates::element_types))
        .route(
            "/api/templates",
            get(handlers::templates::list).post(handlers::templates::create),
        )
        .route(
            "/api/templates/:id",
            get(handlers::templates::load)
                .put(handlers::templates::update)
                .delete(handlers::templates::delete),
        )
        .route("/api/templates/:id/clone", post(handlers::templates::clone))
        .route("/api/templates/:id/preview", post(handlers::preview::stored))
        .route("/api/preview", post(handlers::preview::inline))
        .route("/api/bulk", post(handlers::bulk::generate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use reportcard::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), reportcard::ReportCardError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     ..Default::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), ReportCardError> {
    let store: Arc<dyn TemplateStore> = match &config.templates_dir {
        Some(dir) => Arc::new(FileTemplateStore::open(dir.clone()).await?),
        None => Arc::new(MemoryTemplateStore::new()),
    };

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| ReportCardError::Fetch(format!("HTTP client setup failed: {}", e)))?;

    let source: Arc<dyn AcademicSource> = match (&config.data_url, &config.fixture) {
        (Some(url), _) => Arc::new(HttpAcademicSource::new(http_client.clone(), url.clone())),
        (None, Some(path)) => Arc::new(FixtureSource::from_file(path)?),
        (None, None) => {
            tracing::warn!("no data source configured, bulk generation will find no students");
            Arc::new(FixtureSource::default())
        }
    };

    let resolver = ImageResolver::with_config(config.images.http_client()?, config.images.clone());
    let state = Arc::new(AppState::new(store, source, resolver, config.bulk.clone()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            ReportCardError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", config.listen_addr, e),
            ))
        })?;

    tracing::info!(
        listen = %config.listen_addr,
        templates = ?config.templates_dir,
        data_url = ?config.data_url,
        "reportcard server started"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::{BulkConfig, FixtureData, Student};
    use crate::document::Template;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn app() -> Router {
        let source = FixtureSource::new(FixtureData {
            students: vec![
                Student {
                    id: "s1".into(),
                    name: "Ada".into(),
                    admission_number: "A1".into(),
                    class_id: Some("c1".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let state = AppState::new(
            Arc::new(MemoryTemplateStore::new()),
            Arc::new(source),
            ImageResolver::new(reqwest::Client::new()),
            BulkConfig {
                scale: 0.5,
                ..Default::default()
            },
        );
        router(Arc::new(state))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, name: &str) -> Template {
        let mut template = Template::new(name);
        template.add_element("student_name").unwrap();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/templates",
                serde_json::to_value(&template).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        serde_json::from_value(body_json(response).await).unwrap()
    }

    #[tokio::test]
    async fn element_types_lists_palette() {
        let response = app()
            .oneshot(Request::get("/api/element-types").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let types = body_json(response).await;
        let names: Vec<&str> = types
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["type"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"grade_table"));
        assert!(names.contains(&"school_logo"));
    }

    #[tokio::test]
    async fn template_crud_and_clone() {
        let app = app();
        let created = create(&app, "Standard").await;
        let id = created.id.clone().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/templates/{}/clone", id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let copy: Template = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(copy.name, "Standard (Copy)");
        assert_ne!(copy.id, created.id);
        assert_ne!(copy.elements[0].id, created.elements[0].id);

        let mut renamed = created.clone();
        renamed.name = "Renamed".into();
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/templates/{}", id),
                serde_json::to_value(&renamed).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::get("/api/templates").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let names: Vec<String> = body_json(response)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Renamed", "Standard (Copy)"]);

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/templates/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::get(format!("/api/templates/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn previews_return_png() {
        let app = app();
        let created = create(&app, "Standard").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/templates/{}/preview?scale=0.5", created.id.unwrap()),
                serde_json::json!({"student": {"name": "Ada Obi"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/preview?mode=edit&scale=0.5",
                serde_json::json!({"template": Template::new("Inline")}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/preview?scale=9",
                serde_json::json!({"template": Template::new("Inline")}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn inline_preview_survives_hostile_templates() {
        let secret = tempfile::NamedTempFile::new().unwrap();
        let mut template = Template::new("Hostile");
        let id = template.add_element("image").unwrap().id.clone();
        let el = template.element_mut(&id).unwrap();
        el.width = 1e10;
        el.height = 1e10;
        el.style.border_width = 1e10;
        el.style.border_style = crate::document::BorderStyle::Dotted;
        el.style.font_size = 1e6;
        if let crate::document::ElementKind::Image(props) = &mut el.kind {
            props.url = Some(format!("file://{}", secret.path().display()));
        }

        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/preview?scale=0.5",
                serde_json::json!({
                    "template": template,
                    "context": {"school": {"logoUrl": "http://169.254.169.254/logo.png"}}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let image = image::load_from_memory(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (397, 562));
    }

    #[tokio::test]
    async fn bulk_returns_pdf_attachment() {
        let app = app();

        // no templates yet
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/bulk",
                serde_json::json!({"classId": "c1", "className": "JSS 1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        create(&app, "Standard").await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/bulk",
                serde_json::json!({"classId": "c1", "className": "JSS 1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"JSS_1_report_cards.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
