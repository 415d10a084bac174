//! Live values available at render time.
//!
//! A [`RendererContext`] is rebuilt for every render call: the editor passes
//! none (samples everywhere), the bulk generator builds one per student.
//! Nothing here is persisted with a template.
//!
//! JSON uses camelCase so payloads such as
//! `{"school": {"schoolName": "Test Academy"}}` deserialize directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// School identity fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchoolInfo {
    pub school_name: Option<String>,
    pub address: Option<String>,
    pub motto: Option<String>,
    pub logo_url: Option<String>,
}

/// Student identity fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentInfo {
    pub name: Option<String>,
    pub admission_number: Option<String>,
    pub class_name: Option<String>,
    pub roll_number: Option<String>,
}

/// Term-level academic summary numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcademicSummary {
    pub academic_year: Option<String>,
    pub term: Option<String>,
    pub total_score: Option<f64>,
    pub max_score: Option<f64>,
    pub percentage: Option<f64>,
    pub position: Option<String>,
    pub result: Option<String>,
    pub next_term_date: Option<String>,
}

/// Attendance counts for one student over one term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub total_days: u32,
}

/// One weighted assessment (e.g. "CA 1", "Exam").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentComponent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub weight: f64,
}

/// One grade band of the grading scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: String,
    pub min_score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub remark: String,
}

/// External grading configuration, consumed read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradeTemplate {
    pub id: Option<String>,
    pub name: Option<String>,
    pub components: Vec<AssessmentComponent>,
    pub scale: Vec<GradeBand>,
}

impl GradeTemplate {
    /// Band `score` falls in, if any. See [`band_in`].
    pub fn band_for(&self, score: f64) -> Option<&GradeBand> {
        band_in(&self.scale, score)
    }
}

/// The highest band whose minimum `score` reaches.
///
/// Band maxima are not consulted, so fractional scores between two bands
/// (89.5 against 80-89 and 90-100) land in the lower one.
pub fn band_in(scale: &[GradeBand], score: f64) -> Option<&GradeBand> {
    scale
        .iter()
        .filter(|band| score >= band.min_score)
        .max_by(|a, b| a.min_score.total_cmp(&b.min_score))
}

/// Legacy nested per-assessment score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScore {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub score: f64,
}

/// One subject row of a student's grade summary.
///
/// Backends have shipped component scores in several shapes over time; all
/// of them are kept so [`GradeRow::component_score`] can try each in turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradeRow {
    pub subject: String,
    /// Consolidated scores keyed by component name.
    pub component_scores: BTreeMap<String, f64>,
    /// Legacy nested scores.
    pub assessments: Vec<AssessmentScore>,
    pub total: Option<f64>,
    pub grade: Option<String>,
    pub remark: Option<String>,
    /// Any other fields, e.g. flattened `"exam": 55`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GradeRow {
    /// Score for an assessment component.
    ///
    /// Lookup order: consolidated field by name, legacy nested by name,
    /// legacy nested by id, flattened lowercase field name.
    pub fn component_score(&self, component: &AssessmentComponent) -> Option<f64> {
        if let Some(score) = self.component_scores.get(&component.name) {
            return Some(*score);
        }
        if let Some(a) = self
            .assessments
            .iter()
            .find(|a| a.name.as_deref() == Some(component.name.as_str()))
        {
            return Some(a.score);
        }
        if let Some(a) = self
            .assessments
            .iter()
            .find(|a| a.id.as_deref() == Some(component.id.as_str()))
        {
            return Some(a.score);
        }
        let flat_key = component.name.to_lowercase().replace(' ', "_");
        self.extra
            .get(&flat_key)
            .or_else(|| self.extra.get(&component.name.to_lowercase()))
            .and_then(|v| v.as_f64())
    }
}

/// Live values passed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererContext {
    pub school: SchoolInfo,
    pub student: StudentInfo,
    pub academic: AcademicSummary,
    pub attendance: Option<AttendanceSummary>,
    pub grade_template: Option<GradeTemplate>,
}
