//! # Reportcard CLI
//!
//! Command-line interface for report card templates.
//!
//! ## Usage
//!
//! ```bash
//! # List element types
//! reportcard types
//!
//! # Render a template to PNG with sample values
//! reportcard preview template.json --png preview.png
//!
//! # Render with live values, in the editing view, at 2x
//! reportcard preview template.json --context ctx.json --mode edit --scale 2 --png out.png
//!
//! # Generate a class PDF from a fixture file
//! reportcard bulk template.json --data class.json --out jss2a.pdf --class-name "JSS 2A"
//!
//! # Run the HTTP API
//! reportcard serve --listen 0.0.0.0:8080 --templates-dir ./templates
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use reportcard::{
    ReportCardError, RendererContext, Template,
    bulk::{BulkConfig, BulkGenerator, BulkRequest, FixtureSource},
    document::element_types,
    raster::{ImageResolver, ResolverConfig, render_png},
    server::{self, ServerConfig},
};

/// Reportcard - Report card template engine
#[derive(Parser, Debug)]
#[command(name = "reportcard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ViewMode {
    /// Print view
    Preview,
    /// Editing view with element outlines
    Edit,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List element types that can be added to a template
    Types,

    /// Render a template to PNG
    Preview {
        /// Template JSON file
        template: PathBuf,

        /// Render context JSON file (omit for sample values)
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "preview")]
        mode: ViewMode,

        /// Output PNG file
        #[arg(long, value_name = "FILE")]
        png: PathBuf,

        /// Pixels per document pixel
        #[arg(long, default_value = "1.0")]
        scale: f32,
    },

    /// Generate one PDF page per student
    Bulk {
        /// Template JSON file
        template: PathBuf,

        /// Fixture JSON with school, term, students, grades and attendance
        #[arg(long, value_name = "FILE")]
        data: PathBuf,

        /// Output PDF file (defaults to "<class>_report_cards.pdf")
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Only students of this class (all students when omitted)
        #[arg(long, default_value = "")]
        class_id: String,

        #[arg(long, default_value = "Class")]
        class_name: String,

        /// Students fetched at once
        #[arg(long, env = "REPORTCARD_CONCURRENCY", default_value = "4")]
        concurrency: usize,

        /// Raster scale for PDF pages
        #[arg(long, env = "REPORTCARD_SCALE", default_value = "2.0")]
        scale: f32,
    },

    /// Run the HTTP API server
    Serve {
        /// Address to listen on
        #[arg(long, env = "REPORTCARD_LISTEN", default_value = "127.0.0.1:8080")]
        listen: String,

        /// Directory for template JSON files (in-memory when omitted)
        #[arg(long, env = "REPORTCARD_TEMPLATES_DIR")]
        templates_dir: Option<PathBuf>,

        /// Base URL of the academic records API
        #[arg(long, env = "REPORTCARD_DATA_URL")]
        data_url: Option<String>,

        /// Fixture JSON used when no data URL is set
        #[arg(long, env = "REPORTCARD_FIXTURE")]
        fixture: Option<PathBuf>,

        /// Students fetched at once during bulk generation
        #[arg(long, env = "REPORTCARD_CONCURRENCY", default_value = "4")]
        concurrency: usize,

        /// Extra wait after image loading, in milliseconds
        #[arg(long, env = "REPORTCARD_SETTLE_MS", default_value = "0")]
        settle_ms: u64,

        /// Let templates load file:// images and images on private hosts
        #[arg(long, env = "REPORTCARD_ALLOW_LOCAL_IMAGES")]
        allow_local_images: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), ReportCardError> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Types => {
            for meta in element_types() {
                println!("  {:<20} {:<20} {:?}", meta.type_name, meta.label, meta.family);
            }
        }
        Commands::Preview {
            template,
            context,
            mode,
            png,
            scale,
        } => {
            let template = read_template(&template)?;
            let context = context
                .map(|path| read_json::<RendererContext>(&path))
                .transpose()?;

            println!("Rendering '{}'...", template.name);
            let resolver = local_resolver()?;
            let png_bytes = runtime.block_on(render_png(
                &resolver,
                &template,
                context.as_ref(),
                mode == ViewMode::Preview,
                scale,
            ))?;
            std::fs::write(&png, png_bytes)?;
            println!("Saved to {}", png.display());
        }
        Commands::Bulk {
            template,
            data,
            out,
            class_id,
            class_name,
            concurrency,
            scale,
        } => {
            let template = read_template(&template)?;
            let source = FixtureSource::from_file(&data)?;
            let request = BulkRequest {
                class_id,
                class_name,
                template_id: None,
                school: source.data().school.clone(),
                term: source.data().term.clone().unwrap_or_default(),
            };
            let generator = BulkGenerator::new(
                Arc::new(source),
                local_resolver()?,
                BulkConfig {
                    concurrency,
                    scale,
                    ..Default::default()
                },
            );

            let output = runtime.block_on(generator.generate(&[template], &request, &|p| {
                println!("[{}/{}] {}", p.current, p.total, p.student_name);
            }))?;

            let path = out.unwrap_or_else(|| PathBuf::from(&output.file_name));
            std::fs::write(&path, &output.pdf)?;
            println!("Wrote {} pages to {}", output.pages, path.display());
            if output.degraded > 0 {
                println!(
                    "{} student(s) rendered with placeholders (data unavailable)",
                    output.degraded
                );
            }
        }
        Commands::Serve {
            listen,
            templates_dir,
            data_url,
            fixture,
            concurrency,
            settle_ms,
            allow_local_images,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                templates_dir,
                data_url,
                fixture,
                bulk: BulkConfig {
                    concurrency,
                    settle_delay: Duration::from_millis(settle_ms),
                    ..Default::default()
                },
                images: if allow_local_images {
                    ResolverConfig::local()
                } else {
                    ResolverConfig::default()
                },
            };
            runtime.block_on(server::serve(config))?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReportCardError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn read_template(path: &Path) -> Result<Template, ReportCardError> {
    read_json(path)
}

/// Templates on the command line are the user's own: local images are fine.
fn local_resolver() -> Result<ImageResolver, ReportCardError> {
    let config = ResolverConfig::local();
    Ok(ImageResolver::with_config(config.http_client()?, config))
}
