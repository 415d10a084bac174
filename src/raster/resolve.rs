//! Image resolution: downloads and decodes image sources ahead of rasterizing.
//!
//! `ImageResolver` keeps all fetching concerns out of the rasterizer, which
//! only ever reads a [`ResolvedImages`] map. Resolving is an explicit barrier:
//! once `resolve` returns, every source has either loaded or been recorded
//! as failed.

use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use moka::future::Cache;

use crate::context::RendererContext;
use crate::document::Template;
use crate::error::ReportCardError;
use crate::render::{ImageStates, image_url};

/// Decoded images keyed by source URL.
pub type ResolvedImages = HashMap<String, Arc<DynamicImage>>;

/// Widest or tallest image decoded, in pixels.
const MAX_IMAGE_SIDE: u32 = 8192;

/// What an [`ImageResolver`] may fetch, and how much it keeps.
///
/// The default only reaches public HTTP(S) hosts; templates sent by API
/// clients are resolved under it. [`ResolverConfig::local`] also reads
/// `file://` paths and private addresses, for the CLI.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Read `file://` sources from the local filesystem.
    pub allow_files: bool,
    /// Fetch from loopback, private and link-local addresses.
    pub allow_private_hosts: bool,
    /// Largest accepted image file or response body, in bytes.
    pub max_bytes: usize,
    /// Decoded-image cache budget, in KiB of pixel data.
    pub cache_kib: u64,
    /// How long a cached image is reused.
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_files: false,
            allow_private_hosts: false,
            max_bytes: 10 * 1024 * 1024,
            cache_kib: 256 * 1024,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

impl ResolverConfig {
    /// Everything the local user can reach.
    pub fn local() -> Self {
        Self {
            allow_files: true,
            allow_private_hosts: true,
            ..Default::default()
        }
    }

    /// HTTP client whose redirects obey the host policy.
    pub fn http_client(&self) -> Result<reqwest::Client, ReportCardError> {
        let allow_private = self.allow_private_hosts;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= 5 {
                attempt.error("too many redirects")
            } else if !allow_private && is_private_host(attempt.url()) {
                attempt.error("redirect to a private address")
            } else {
                attempt.follow()
            }
        });
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(policy)
            .build()
            .map_err(|e| ReportCardError::Fetch(format!("HTTP client setup failed: {}", e)))
    }
}

/// Whether `url` points at this machine or a private network.
///
/// Only literal addresses and `localhost` names are recognised; DNS names
/// are not resolved here.
pub fn is_private_host(url: &reqwest::Url) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let lower = host.to_ascii_lowercase();
    if lower == "localhost" || lower.ends_with(".localhost") {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            ip.is_loopback()
                || ip.is_private()
                || ip.is_link_local()
                || ip.is_unspecified()
                || ip.is_broadcast()
        }
        Ok(IpAddr::V6(ip)) => {
            let first = ip.segments()[0];
            ip.is_loopback()
                || ip.is_unspecified()
                || first & 0xfe00 == 0xfc00
                || first & 0xffc0 == 0xfe80
                || ip
                    .to_ipv4_mapped()
                    .is_some_and(|v4| v4.is_loopback() || v4.is_private() || v4.is_link_local())
        }
        Err(_) => false,
    }
}

/// Downloads images over HTTP(S) or reads `file://` paths, with a bounded
/// shared cache.
#[derive(Clone)]
pub struct ImageResolver {
    http_client: reqwest::Client,
    config: ResolverConfig,
    cache: Cache<String, Arc<DynamicImage>>,
}

impl ImageResolver {
    /// Resolver for public HTTP(S) images only.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_config(http_client, ResolverConfig::default())
    }

    pub fn with_config(http_client: reqwest::Client, config: ResolverConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_kib)
            .weigher(|_url: &String, image: &Arc<DynamicImage>| {
                let kib = image.as_bytes().len() / 1024;
                u32::try_from(kib).unwrap_or(u32::MAX).max(1)
            })
            .time_to_live(config.cache_ttl)
            .build();
        Self {
            http_client,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Fetch one image, using the cache when possible.
    pub async fn fetch(&self, url: &str) -> Result<Arc<DynamicImage>, ReportCardError> {
        if let Some(image) = self.cache.get(url).await {
            return Ok(image);
        }

        let bytes = match url.strip_prefix("file://") {
            Some(path) if self.config.allow_files => self.read_file(url, path).await?,
            Some(_) => {
                return Err(ReportCardError::Image(format!(
                    "Refusing {}: file sources are disabled",
                    url
                )));
            }
            None => self.download(url).await?,
        };
        let image = Arc::new(decode(url, bytes)?);

        self.cache.insert(url.to_string(), image.clone()).await;
        Ok(image)
    }

    async fn read_file(&self, url: &str, path: &str) -> Result<Vec<u8>, ReportCardError> {
        let read_error =
            |e: std::io::Error| ReportCardError::Image(format!("Failed to read {}: {}", url, e));
        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        if size > self.config.max_bytes as u64 {
            return Err(too_large(url, self.config.max_bytes));
        }
        tokio::fs::read(path).await.map_err(read_error)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ReportCardError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ReportCardError::Image(format!("Invalid image URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ReportCardError::Image(format!(
                "Refusing {}: unsupported scheme",
                url
            )));
        }
        if !self.config.allow_private_hosts && is_private_host(&parsed) {
            return Err(ReportCardError::Image(format!(
                "Refusing {}: private address",
                url
            )));
        }

        let mut response = self
            .http_client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ReportCardError::Image(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(ReportCardError::Image(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let max = self.config.max_bytes;
        if response.content_length().is_some_and(|len| len > max as u64) {
            return Err(too_large(url, max));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ReportCardError::Image(format!("Failed to read image data: {}", e)))?
        {
            if bytes.len() + chunk.len() > max {
                return Err(too_large(url, max));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// Resolve a set of URLs. Failures are logged and left out of the map.
    pub async fn resolve_urls<I>(&self, urls: I) -> ResolvedImages
    where
        I: IntoIterator<Item = String>,
    {
        let unique: BTreeSet<String> = urls.into_iter().collect();
        let fetches = unique.into_iter().map(|url| async move {
            let result = self.fetch(&url).await;
            (url, result)
        });

        let mut resolved = ResolvedImages::new();
        for (url, result) in futures::future::join_all(fetches).await {
            match result {
                Ok(image) => {
                    resolved.insert(url, image);
                }
                Err(e) => tracing::warn!(%url, error = %e, "image unavailable, using placeholder"),
            }
        }
        resolved
    }

    /// Resolve every image a template shows under `ctx`, recording per-element
    /// load state in `states`.
    pub async fn resolve_template(
        &self,
        template: &Template,
        ctx: Option<&RendererContext>,
        states: &mut ImageStates,
    ) -> ResolvedImages {
        let sources: Vec<(String, String)> = template
            .elements
            .iter()
            .filter(|el| el.visible)
            .filter_map(|el| image_url(el, ctx).map(|url| (el.id.clone(), url)))
            .collect();
        let resolved = self
            .resolve_urls(sources.iter().map(|(_, url)| url.clone()))
            .await;
        for (element_id, url) in &sources {
            if resolved.contains_key(url) {
                states.mark_loaded(element_id, url);
            } else {
                states.mark_failed(element_id, url);
            }
        }
        resolved
    }
}

fn too_large(url: &str, max: usize) -> ReportCardError {
    ReportCardError::Image(format!("Refusing {}: larger than {} bytes", url, max))
}

fn decode(url: &str, bytes: Vec<u8>) -> Result<DynamicImage, ReportCardError> {
    let mut reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ReportCardError::Image(format!("Failed to decode {}: {}", url, e)))?;
    let mut limits = image::Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_SIDE);
    limits.max_image_height = Some(MAX_IMAGE_SIDE);
    reader.limits(limits);
    reader
        .decode()
        .map_err(|e| ReportCardError::Image(format!("Failed to decode {}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, routing::get};
    use image::{Rgba, RgbaImage};

    fn png_bytes(side: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(side, side, Rgba([0, 0, 255, 255]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn write_png(dir: &std::path::Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, png_bytes(2)).unwrap();
        format!("file://{}", path.display())
    }

    fn local() -> ImageResolver {
        ImageResolver::with_config(reqwest::Client::new(), ResolverConfig::local())
    }

    /// Serves `/logo.png` (a small image) and `/big.png` (padding past 4 KiB).
    async fn image_server() -> String {
        let big = {
            let mut bytes = png_bytes(2);
            bytes.resize(4096, 0);
            bytes
        };
        let app = Router::new()
            .route("/logo.png", get(|| async { png_bytes(2) }))
            .route("/big.png", get(move || async move { big }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn file_urls_resolve_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let url = write_png(dir.path(), "logo.png");
        let resolver = local();
        let first = resolver.fetch(&url).await.unwrap();
        std::fs::remove_file(dir.path().join("logo.png")).unwrap();
        let second = resolver.fetch(&url).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn file_sources_need_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let url = write_png(dir.path(), "logo.png");
        let resolver = ImageResolver::new(reqwest::Client::new());
        let err = resolver.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("file sources are disabled"), "{}", err);
    }

    #[test]
    fn private_hosts_are_recognised() {
        let private = [
            "http://localhost/a.png",
            "http://api.localhost/a.png",
            "http://127.0.0.1:8080/a.png",
            "http://10.1.2.3/a.png",
            "http://192.168.0.10/a.png",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/a.png",
            "http://[fd00::1]/a.png",
            "http://[::ffff:127.0.0.1]/a.png",
        ];
        for url in private {
            assert!(is_private_host(&reqwest::Url::parse(url).unwrap()), "{}", url);
        }
        let public = ["https://cdn.example.com/logo.png", "http://93.184.216.34/a.png"];
        for url in public {
            assert!(!is_private_host(&reqwest::Url::parse(url).unwrap()), "{}", url);
        }
    }

    #[tokio::test]
    async fn private_hosts_are_refused_by_default() {
        let base = image_server().await;
        let url = format!("{}/logo.png", base);

        let remote_only = ImageResolver::new(reqwest::Client::new());
        let err = remote_only.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("private address"), "{}", err);
        assert!(remote_only.fetch("ftp://example.com/a.png").await.is_err());

        let image = local().fetch(&url).await.unwrap();
        assert_eq!(image.width(), 2);
    }

    #[tokio::test]
    async fn oversized_downloads_and_files_fail() {
        let base = image_server().await;
        let dir = tempfile::tempdir().unwrap();
        let file = write_png(dir.path(), "logo.png");
        let capped = ImageResolver::with_config(
            reqwest::Client::new(),
            ResolverConfig {
                max_bytes: 1024,
                ..ResolverConfig::local()
            },
        );

        let err = capped.fetch(&format!("{}/big.png", base)).await.unwrap_err();
        assert!(err.to_string().contains("larger than 1024 bytes"), "{}", err);
        assert!(capped.fetch(&format!("{}/logo.png", base)).await.is_ok());
        assert!(capped.fetch(&file).await.is_ok());

        let tiny = ImageResolver::with_config(
            reqwest::Client::new(),
            ResolverConfig {
                max_bytes: 8,
                ..ResolverConfig::local()
            },
        );
        assert!(tiny.fetch(&file).await.is_err());
    }

    #[tokio::test]
    async fn cache_stays_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ImageResolver::with_config(
            reqwest::Client::new(),
            ResolverConfig {
                cache_kib: 2,
                ..ResolverConfig::local()
            },
        );
        for i in 0..6 {
            let url = write_png(dir.path(), &format!("logo{}.png", i));
            resolver.fetch(&url).await.unwrap();
        }
        resolver.cache.run_pending_tasks().await;
        assert!(resolver.cache.entry_count() <= 2);
    }

    #[tokio::test]
    async fn template_resolution_marks_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "logo.png");
        let bad = format!("file://{}/missing.png", dir.path().display());

        let mut template = Template::new("t");
        template.add_element("school_logo").unwrap();
        let image_id = template.add_element("image").unwrap().id.clone();
        if let Some(el) = template.element_mut(&image_id)
            && let crate::document::ElementKind::Image(props) = &mut el.kind
        {
            props.url = Some(bad.clone());
        }
        let mut ctx = RendererContext::default();
        ctx.school.logo_url = Some(good.clone());

        let resolver = local();
        let mut states = ImageStates::new();
        let resolved = resolver
            .resolve_template(&template, Some(&ctx), &mut states)
            .await;
        assert!(resolved.contains_key(&good));
        assert!(!resolved.contains_key(&bad));
        assert!(states.is_failed(&image_id, &bad));
        let logo_id = &template.elements[0].id;
        assert!(!states.is_failed(logo_id, &good));
    }
}
