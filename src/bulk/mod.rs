//! # Bulk Generation
//!
//! Produces one PDF holding a report card page per student of a class.
//!
//! The pipeline runs in four stages:
//!
//! 1. **Roster**: fetch the class roster and sort it by admission number
//!    ([`natural_cmp`]).
//! 2. **Fetch**: load each student's full record and, when the term is
//!    known, their grades and attendance, through a bounded,
//!    order-preserving stream. A failed fetch is logged; the page keeps the
//!    student's identity and falls back to placeholder values for the rest.
//! 3. **Resolve**: download every image the batch shows, once, before any
//!    page is drawn.
//! 4. **Export**: rasterize pages in parallel and append them to the PDF in
//!    roster order.

mod sort;
pub mod source;

pub use sort::natural_cmp;
pub use source::{
    AcademicSource, FixtureData, FixtureSource, GradeSummary, HttpAcademicSource, Student,
    TermInfo,
};

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rayon::prelude::*;

use crate::context::{
    AcademicSummary, AttendanceSummary, GradeTemplate, RendererContext, SchoolInfo, StudentInfo,
};
use crate::document::{ElementData, ElementKind, Template};
use crate::error::ReportCardError;
use crate::raster::{EXPORT_SCALE, ImageResolver, PdfBuilder, Rasterizer, ResolvedImages};
use crate::render::{ImageStates, PageView, image_url};

/// Tuning knobs for a bulk run.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Students fetched at once.
    pub concurrency: usize,
    /// Raster scale for PDF pages.
    pub scale: f32,
    /// Extra wait after image resolution. Zero skips it.
    pub settle_delay: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            scale: EXPORT_SCALE,
            settle_delay: Duration::ZERO,
        }
    }
}

/// What to generate.
#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    pub class_id: String,
    pub class_name: String,
    /// Explicit template choice; otherwise the default template is used.
    pub template_id: Option<String>,
    pub school: SchoolInfo,
    pub term: TermInfo,
}

/// Progress report, emitted once per student in roster order.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub student_name: String,
}

/// A finished batch.
#[derive(Debug, Clone)]
pub struct BulkOutput {
    pub file_name: String,
    pub pages: usize,
    pub pdf: Vec<u8>,
    /// Students whose data could not be fetched.
    pub degraded: usize,
}

/// One student's page, ready to draw.
#[derive(Debug, Clone)]
pub struct StudentPage {
    pub student: Student,
    pub template: Template,
    pub context: RendererContext,
    pub degraded: bool,
}

/// Pick the template for a batch: explicit id, then the first default, then
/// the first one available.
pub fn select_template<'a>(
    templates: &'a [Template],
    template_id: Option<&str>,
) -> Result<&'a Template, ReportCardError> {
    if let Some(id) = template_id {
        return templates
            .iter()
            .find(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| ReportCardError::NotFound(format!("template '{}'", id)));
    }
    templates
        .iter()
        .find(|t| t.is_default)
        .or_else(|| templates.first())
        .ok_or(ReportCardError::NoTemplate)
}

/// `"JSS 2A"` -> `"JSS_2A_report_cards.pdf"`.
pub fn report_file_name(class_name: &str) -> String {
    let class: String = class_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if class.is_empty() {
        "report_cards.pdf".to_string()
    } else {
        format!("{}_report_cards.pdf", class)
    }
}

/// Merge school, term and student records into a render context.
///
/// Without `summary` the academic and attendance fields stay unset, so they
/// render as samples.
pub fn student_context(
    request: &BulkRequest,
    grade_template: Option<&GradeTemplate>,
    student: &Student,
    summary: Option<(&GradeSummary, AttendanceSummary)>,
) -> RendererContext {
    let grades = summary.map(|(grades, _)| grades);
    let class_name = student
        .class_name
        .clone()
        .or_else(|| Some(request.class_name.clone()).filter(|c| !c.is_empty()));
    RendererContext {
        school: request.school.clone(),
        student: StudentInfo {
            name: Some(student.name.clone()),
            admission_number: Some(student.admission_number.clone()),
            class_name,
            roll_number: student.roll_number.clone(),
        },
        academic: AcademicSummary {
            academic_year: request.term.academic_year.clone(),
            term: Some(request.term.name.clone()).filter(|t| !t.is_empty()),
            total_score: grades.and_then(|g| g.total_score),
            max_score: grades.and_then(|g| g.max_score),
            percentage: grades.and_then(|g| g.percentage),
            position: grades.and_then(|g| g.position.clone()),
            result: grades.and_then(|g| g.result.clone()),
            next_term_date: request.term.next_term_date.clone(),
        },
        attendance: summary.map(|(_, attendance)| attendance),
        grade_template: grade_template.cloned(),
    }
}

/// Copy of `template` with student data attached to its table elements.
pub fn attach_data(template: &Template, grades: &GradeSummary, attendance: AttendanceSummary) -> Template {
    let mut filled = template.clone();
    for el in &mut filled.elements {
        match el.kind {
            ElementKind::GradeTable(_) => {
                el.data = Some(ElementData::Grades {
                    rows: grades.subjects.clone(),
                });
            }
            ElementKind::AttendanceTable(_) => {
                el.data = Some(ElementData::Attendance(attendance));
            }
            _ => {}
        }
    }
    filled
}

/// Runs bulk batches against an [`AcademicSource`].
pub struct BulkGenerator {
    source: Arc<dyn AcademicSource>,
    resolver: ImageResolver,
    config: BulkConfig,
}

impl BulkGenerator {
    pub fn new(source: Arc<dyn AcademicSource>, resolver: ImageResolver, config: BulkConfig) -> Self {
        Self {
            source,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Generate the class PDF.
    ///
    /// Template selection, an empty roster, and raster or PDF failures abort
    /// the batch. Per-student fetch failures do not.
    pub async fn generate(
        &self,
        templates: &[Template],
        request: &BulkRequest,
        progress: &(dyn Fn(Progress) + Send + Sync),
    ) -> Result<BulkOutput, ReportCardError> {
        let template = select_template(templates, request.template_id.as_deref())?;
        tracing::info!(
            template = %template.name,
            class = %request.class_name,
            "starting bulk generation"
        );

        let pages = self.prepare(template, request, progress).await?;
        let degraded = pages.iter().filter(|p| p.degraded).count();

        let images = self.resolve_images(&pages).await;
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let title = format!("{} report cards", request.class_name);
        let page_size = template.page_size();
        let scale = self.config.scale;
        let count = pages.len();
        let pdf = tokio::task::spawn_blocking(move || export_pdf(&title, page_size, &pages, &images, scale))
            .await
            .map_err(|e| ReportCardError::Export(format!("export task failed: {}", e)))??;

        tracing::info!(pages = count, degraded, bytes = pdf.len(), "bulk generation finished");
        Ok(BulkOutput {
            file_name: report_file_name(&request.class_name),
            pages: count,
            pdf,
            degraded,
        })
    }

    /// Fetch and sort the roster, then build each student's page in roster
    /// order. Progress is reported as each page becomes ready.
    pub async fn prepare(
        &self,
        template: &Template,
        request: &BulkRequest,
        progress: &(dyn Fn(Progress) + Send + Sync),
    ) -> Result<Vec<StudentPage>, ReportCardError> {
        let mut roster = self.source.roster(&request.class_id).await?;
        if roster.is_empty() {
            return Err(ReportCardError::Fetch(format!(
                "class '{}' has no students",
                request.class_id
            )));
        }
        roster.sort_by(|a, b| natural_cmp(&a.admission_number, &b.admission_number));

        let grade_template = match self.source.grade_template().await {
            Ok(gt) => gt,
            Err(e) => {
                tracing::warn!(error = %e, "grade template unavailable, using default scale");
                None
            }
        };

        let total = roster.len();
        let concurrency = self.config.concurrency.max(1);
        let mut stream = futures::stream::iter(roster)
            .map(|student| self.student_page(template, request, grade_template.as_ref(), student))
            .buffered(concurrency);

        let mut pages = Vec::with_capacity(total);
        while let Some(page) = stream.next().await {
            progress(Progress {
                current: pages.len() + 1,
                total,
                student_name: page.student.name.clone(),
            });
            pages.push(page);
        }
        Ok(pages)
    }

    async fn student_page(
        &self,
        template: &Template,
        request: &BulkRequest,
        grade_template: Option<&GradeTemplate>,
        entry: Student,
    ) -> StudentPage {
        let (student, mut degraded) = match self.source.student(&entry.id).await {
            Ok(record) => (record.or_roster(entry), false),
            Err(e) => {
                tracing::warn!(
                    student = %entry.name,
                    error = %e,
                    "student record unavailable, using roster entry"
                );
                (entry, true)
            }
        };

        let term_id = request.term.id.as_str();
        let summary = if term_id.is_empty() {
            None
        } else {
            let fetched = futures::try_join!(
                self.source.grade_summary(&student.id, term_id),
                self.source.attendance_summary(&student.id, term_id),
            );
            match fetched {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!(
                        student = %student.name,
                        error = %e,
                        "student data unavailable, rendering placeholders"
                    );
                    degraded = true;
                    None
                }
            }
        };

        let (context, template) = match &summary {
            Some((grades, attendance)) => (
                student_context(request, grade_template, &student, Some((grades, *attendance))),
                attach_data(template, grades, *attendance),
            ),
            None => (
                student_context(request, grade_template, &student, None),
                template.clone(),
            ),
        };
        StudentPage {
            student,
            template,
            context,
            degraded,
        }
    }

    async fn resolve_images(&self, pages: &[StudentPage]) -> ResolvedImages {
        let urls: Vec<String> = pages
            .iter()
            .flat_map(|page| {
                page.template
                    .elements
                    .iter()
                    .filter(|el| el.visible)
                    .filter_map(|el| image_url(el, Some(&page.context)))
            })
            .collect();
        self.resolver.resolve_urls(urls).await
    }
}

fn export_pdf(
    title: &str,
    page_size: (u32, u32),
    pages: &[StudentPage],
    images: &ResolvedImages,
    scale: f32,
) -> Result<Vec<u8>, ReportCardError> {
    let rasterizer = Rasterizer::new(images);
    let states = ImageStates::default();
    let rasters = pages
        .par_iter()
        .map(|page| {
            let rendered = page
                .template
                .render_page(Some(&page.context), PageView::preview(), &states);
            rasterizer.rasterize(&rendered, scale)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = PdfBuilder::new(title, page_size);
    for raster in &rasters {
        builder.add_page(raster)?;
    }
    builder.finish()
}
