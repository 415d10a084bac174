//! Roster and academic data sources for bulk generation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::context::{AttendanceSummary, GradeRow, GradeTemplate, SchoolInfo};
use crate::error::ReportCardError;

/// A roster entry / student record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub admission_number: String,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
    pub roll_number: Option<String>,
}

impl Student {
    /// This full record, with gaps filled from the roster entry it was
    /// looked up by.
    pub fn or_roster(self, entry: Student) -> Student {
        let filled = |value: String, fallback: String| {
            if value.trim().is_empty() {
                fallback
            } else {
                value
            }
        };
        Student {
            id: entry.id,
            name: filled(self.name, entry.name),
            admission_number: filled(self.admission_number, entry.admission_number),
            class_id: self.class_id.or(entry.class_id),
            class_name: self.class_name.or(entry.class_name),
            roll_number: self.roll_number.or(entry.roll_number),
        }
    }
}

/// Per-student grade summary for one term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradeSummary {
    pub subjects: Vec<GradeRow>,
    pub total_score: Option<f64>,
    pub max_score: Option<f64>,
    pub percentage: Option<f64>,
    pub position: Option<String>,
    pub result: Option<String>,
}

/// The active academic term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TermInfo {
    pub id: String,
    pub name: String,
    pub academic_year: Option<String>,
    pub next_term_date: Option<String>,
}

/// Read access to roster and academic records.
#[async_trait]
pub trait AcademicSource: Send + Sync {
    /// Students of a class, in no particular order.
    async fn roster(&self, class_id: &str) -> Result<Vec<Student>, ReportCardError>;

    /// Full student record.
    async fn student(&self, student_id: &str) -> Result<Student, ReportCardError>;

    async fn grade_summary(
        &self,
        student_id: &str,
        term_id: &str,
    ) -> Result<GradeSummary, ReportCardError>;

    async fn attendance_summary(
        &self,
        student_id: &str,
        term_id: &str,
    ) -> Result<AttendanceSummary, ReportCardError>;

    /// Grading configuration, if the school has one.
    async fn grade_template(&self) -> Result<Option<GradeTemplate>, ReportCardError>;
}

// ============================================================================
// HTTP
// ============================================================================

/// JSON REST backend.
///
/// Endpoints, relative to the base URL:
/// `classes/{id}/students`, `students/{id}`, `students/{id}/grades?term=`,
/// `students/{id}/attendance?term=`, `grade-template`.
pub struct HttpAcademicSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAcademicSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `base/<segments...>[?term=]`, each segment escaped on its own.
    fn endpoint(
        &self,
        segments: &[&str],
        term: Option<&str>,
    ) -> Result<reqwest::Url, ReportCardError> {
        let invalid = || ReportCardError::Fetch(format!("invalid data URL {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        if let Some(term) = term {
            url.query_pairs_mut().append_pair("term", term);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, ReportCardError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ReportCardError::Fetch(format!("GET {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(ReportCardError::Fetch(format!(
                "GET {}: HTTP {}",
                url,
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ReportCardError::Fetch(format!("GET {}: invalid body: {}", url, e)))
    }
}

#[async_trait]
impl AcademicSource for HttpAcademicSource {
    async fn roster(&self, class_id: &str) -> Result<Vec<Student>, ReportCardError> {
        self.get_json(self.endpoint(&["classes", class_id, "students"], None)?)
            .await
    }

    async fn student(&self, student_id: &str) -> Result<Student, ReportCardError> {
        self.get_json(self.endpoint(&["students", student_id], None)?)
            .await
    }

    async fn grade_summary(
        &self,
        student_id: &str,
        term_id: &str,
    ) -> Result<GradeSummary, ReportCardError> {
        self.get_json(self.endpoint(&["students", student_id, "grades"], Some(term_id))?)
            .await
    }

    async fn attendance_summary(
        &self,
        student_id: &str,
        term_id: &str,
    ) -> Result<AttendanceSummary, ReportCardError> {
        self.get_json(self.endpoint(&["students", student_id, "attendance"], Some(term_id))?)
            .await
    }

    async fn grade_template(&self) -> Result<Option<GradeTemplate>, ReportCardError> {
        self.get_json(self.endpoint(&["grade-template"], None)?)
            .await
    }
}

// ============================================================================
// FIXTURE
// ============================================================================

/// Everything a fixture file holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixtureData {
    pub school: SchoolInfo,
    pub term: Option<TermInfo>,
    pub grade_template: Option<GradeTemplate>,
    pub students: Vec<Student>,
    /// Grade summaries keyed by student id.
    pub grades: HashMap<String, GradeSummary>,
    /// Attendance keyed by student id.
    pub attendance: HashMap<String, AttendanceSummary>,
}

/// In-memory source backed by [`FixtureData`], for the CLI and tests.
///
/// Missing records surface as fetch errors, like a backend 404 would.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    data: FixtureData,
}

impl FixtureSource {
    pub fn new(data: FixtureData) -> Self {
        Self { data }
    }

    pub fn from_file(path: &Path) -> Result<Self, ReportCardError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&text)?))
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }
}

#[async_trait]
impl AcademicSource for FixtureSource {
    /// An empty class id selects every student.
    async fn roster(&self, class_id: &str) -> Result<Vec<Student>, ReportCardError> {
        Ok(self
            .data
            .students
            .iter()
            .filter(|s| class_id.is_empty() || s.class_id.as_deref() == Some(class_id))
            .cloned()
            .collect())
    }

    async fn student(&self, student_id: &str) -> Result<Student, ReportCardError> {
        self.data
            .students
            .iter()
            .find(|s| s.id == student_id)
            .cloned()
            .ok_or_else(|| ReportCardError::Fetch(format!("no student '{}'", student_id)))
    }

    async fn grade_summary(
        &self,
        student_id: &str,
        _term_id: &str,
    ) -> Result<GradeSummary, ReportCardError> {
        self.data
            .grades
            .get(student_id)
            .cloned()
            .ok_or_else(|| ReportCardError::Fetch(format!("no grades for '{}'", student_id)))
    }

    async fn attendance_summary(
        &self,
        student_id: &str,
        _term_id: &str,
    ) -> Result<AttendanceSummary, ReportCardError> {
        self.data
            .attendance
            .get(student_id)
            .copied()
            .ok_or_else(|| ReportCardError::Fetch(format!("no attendance for '{}'", student_id)))
    }

    async fn grade_template(&self) -> Result<Option<GradeTemplate>, ReportCardError> {
        Ok(self.data.grade_template.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> FixtureSource {
        let data: FixtureData = serde_json::from_value(serde_json::json!({
            "school": {"schoolName": "Test Academy"},
            "students": [
                {"id": "s1", "name": "Ada", "admissionNumber": "A2", "classId": "c1"},
                {"id": "s2", "name": "Ben", "admissionNumber": "A1", "classId": "c2"}
            ],
            "grades": {"s1": {"subjects": [{"subject": "Maths", "total": 80}], "percentage": 80}},
            "attendance": {"s1": {"present": 50, "absent": 2, "late": 0, "totalDays": 52}}
        }))
        .unwrap();
        FixtureSource::new(data)
    }

    #[tokio::test]
    async fn roster_filters_by_class() {
        let source = fixture();
        assert_eq!(source.roster("c1").await.unwrap().len(), 1);
        assert_eq!(source.roster("").await.unwrap().len(), 2);
        assert!(source.roster("c9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_records_are_fetch_errors() {
        let source = fixture();
        assert_eq!(source.grade_summary("s1", "t").await.unwrap().subjects.len(), 1);
        assert!(matches!(
            source.grade_summary("s2", "t").await,
            Err(ReportCardError::Fetch(_))
        ));
        assert!(source.attendance_summary("s2", "t").await.is_err());
        assert!(source.student("nobody").await.is_err());
    }

    #[test]
    fn full_record_keeps_roster_gaps_filled() {
        let entry = Student {
            id: "s1".into(),
            name: "Ada".into(),
            admission_number: "A2".into(),
            class_name: Some("JSS 2A".into()),
            ..Default::default()
        };
        let record = Student {
            id: "ignored".into(),
            name: "Ada Obi".into(),
            roll_number: Some("7".into()),
            ..Default::default()
        };
        let merged = record.or_roster(entry);
        assert_eq!(merged.id, "s1");
        assert_eq!(merged.name, "Ada Obi");
        assert_eq!(merged.admission_number, "A2");
        assert_eq!(merged.class_name.as_deref(), Some("JSS 2A"));
        assert_eq!(merged.roll_number.as_deref(), Some("7"));
    }

    #[test]
    fn endpoints_escape_ids_and_term() {
        let source = HttpAcademicSource::new(reqwest::Client::new(), "http://school.test/api/");
        let url = source
            .endpoint(&["students", "a/b c", "grades"], Some("2024/25 T1&x=1"))
            .unwrap();
        assert_eq!(url.path(), "/api/students/a%2Fb%20c/grades");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(query, vec![("term".to_string(), "2024/25 T1&x=1".to_string())]);

        let url = source.endpoint(&["grade-template"], None).unwrap();
        assert_eq!(url.as_str(), "http://school.test/api/grade-template");
    }

    #[tokio::test]
    async fn http_source_reaches_escaped_routes() {
        use axum::{
            Json, Router,
            extract::{Path as UrlPath, Query},
            routing::get,
        };

        let app = Router::new().route(
            "/api/students/:id/grades",
            get(
                |UrlPath(id): UrlPath<String>, Query(q): Query<HashMap<String, String>>| async move {
                    let term = q.get("term").cloned().unwrap_or_default();
                    Json(GradeSummary {
                        position: Some(format!("{}|{}", id, term)),
                        ..Default::default()
                    })
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let source = HttpAcademicSource::new(reqwest::Client::new(), base);
        let summary = source.grade_summary("GSS/2", "t 1&2").await.unwrap();
        assert_eq!(summary.position.as_deref(), Some("GSS/2|t 1&2"));
        assert!(matches!(
            source.student("nobody").await,
            Err(ReportCardError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn fixture_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, r#"{"students": [{"id": "x", "admissionNumber": "Z9"}]}"#).unwrap();
        let source = FixtureSource::from_file(&path).unwrap();
        assert_eq!(source.data().students[0].admission_number, "Z9");
        assert!(source.grade_template().await.unwrap().is_none());
    }
}
