//! # End-to-end Tests
//!
//! These tests drive the public API the way the CLI and server do: build a
//! template in the editor shell, persist it, render it with and without live
//! data, and generate a class PDF from a fixture file.

use pretty_assertions::assert_eq;
use reportcard::bulk::{BulkConfig, BulkGenerator, BulkRequest, FixtureSource};
use reportcard::context::RendererContext;
use reportcard::document::{ElementKind, Template};
use reportcard::editor::{EditorShell, Key};
use reportcard::raster::{ImageResolver, render_png};
use reportcard::render::PageView;
use reportcard::store::{FileTemplateStore, TemplateStore};
use std::sync::{Arc, Mutex};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// A typical report card laid out through the editor shell.
fn standard_template() -> Template {
    let mut shell = EditorShell::new(Template::new("Standard Report Card"));
    for type_name in [
        "school_name",
        "student_name",
        "class_name",
        "term",
        "grade_table",
        "percentage",
        "attendance_table",
        "grading_scale",
        "signature",
    ] {
        shell.add_element(type_name).unwrap();
    }
    shell.into_template()
}

fn fixture_json() -> serde_json::Value {
    serde_json::json!({
        "school": {"schoolName": "Test Academy", "motto": "Excel"},
        "term": {"id": "t1", "name": "Second Term", "academicYear": "2025/2026"},
        "gradeTemplate": {
            "components": [
                {"id": "ca", "name": "CA", "weight": 40},
                {"id": "exam", "name": "Exam", "weight": 60}
            ],
            "scale": [
                {"grade": "A", "minScore": 70, "maxScore": 100, "remark": "Excellent"},
                {"grade": "C", "minScore": 50, "maxScore": 69.99, "remark": "Credit"},
                {"grade": "F", "minScore": 0, "maxScore": 49.99, "remark": "Fail"}
            ]
        },
        "students": [
            {"id": "s10", "name": "Zed Musa", "admissionNumber": "GSS/10", "classId": "jss2a"},
            {"id": "s2", "name": "Ada Obi", "admissionNumber": "GSS/2", "classId": "jss2a"},
            {"id": "s9", "name": "Other Class", "admissionNumber": "GSS/1", "classId": "jss3b"}
        ],
        "grades": {
            "s2": {
                "subjects": [
                    {"subject": "Mathematics", "componentScores": {"CA": 30, "Exam": 52}},
                    {"subject": "English", "assessments": [{"name": "CA", "score": 20}], "exam": 35}
                ],
                "percentage": 68.5,
                "position": "2nd"
            },
            "s10": {"subjects": [], "percentage": 40}
        },
        "attendance": {
            "s2": {"present": 58, "absent": 4, "late": 2, "totalDays": 62},
            "s10": {"present": 40, "absent": 22, "late": 0, "totalDays": 62}
        }
    })
}

fn fixture() -> FixtureSource {
    FixtureSource::new(serde_json::from_value(fixture_json()).unwrap())
}

// ============================================================================
// TEMPLATE LIFECYCLE
// ============================================================================

#[tokio::test]
async fn template_survives_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTemplateStore::open(dir.path()).await.unwrap();

    let saved = store.save(standard_template()).await.unwrap();
    let loaded = store.load(saved.id.as_deref().unwrap()).await.unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.elements.len(), 9);

    // z order is preserved: later elements stay on top
    let z: Vec<i32> = loaded.elements.iter().map(|el| el.z_index).collect();
    let mut sorted = z.clone();
    sorted.sort();
    assert_eq!(z, sorted);
}

#[test]
fn editor_keyboard_delete_respects_focus() {
    let mut shell = EditorShell::new(standard_template());
    let id = shell.template().elements[1].id.clone();
    shell.select(Some(id.as_str()));

    shell.focus = reportcard::editor::Focus::TextInput;
    shell.key_down(Key::Delete);
    assert!(shell.template().element(&id).is_some());

    shell.focus = reportcard::editor::Focus::Canvas;
    shell.key_down(Key::Delete);
    assert!(shell.template().element(&id).is_none());
    assert!(shell.selection().is_none());
}

// ============================================================================
// RENDERING
// ============================================================================

#[test]
fn samples_fill_every_placeholder_without_context() {
    let page = standard_template().render_page(None, PageView::preview(), &Default::default());
    let text = page.text_content();
    assert!(text.contains(&"GREENFIELD SECONDARY SCHOOL".to_string()));
    assert!(text.contains(&"Name: John Doe".to_string()));
    assert!(text.iter().all(|line| !line.contains('[')), "{:?}", text);
}

#[test]
fn context_values_replace_samples() {
    let ctx: RendererContext = serde_json::from_value(serde_json::json!({
        "school": {"schoolName": "Test Academy"},
        "student": {"name": "Ada Obi", "className": "JSS 2A"},
        "academic": {"percentage": 68.5}
    }))
    .unwrap();
    let page = standard_template().render_page(Some(&ctx), PageView::preview(), &Default::default());
    let text = page.text_content();
    assert!(text.contains(&"Test Academy".to_string()));
    assert!(text.contains(&"Name: Ada Obi".to_string()));
    assert!(text.contains(&"Class: JSS 2A".to_string()));
    assert!(text.contains(&"Percentage: 68.5%".to_string()));
    // unset fields still fall back to samples
    assert!(text.contains(&"Term: First Term".to_string()));
}

#[tokio::test]
async fn preview_png_matches_page_size() {
    let mut template = standard_template();
    template.orientation = reportcard::document::Orientation::Landscape;
    let resolver = ImageResolver::new(reqwest::Client::new());
    let png = render_png(&resolver, &template, None, false, 1.0).await.unwrap();
    let image = image::load_from_memory(&png).unwrap();
    assert_eq!((image.width(), image.height()), (1123, 794));
}

// ============================================================================
// BULK GENERATION
// ============================================================================

#[tokio::test]
async fn bulk_generation_from_fixture_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("class.json");
    std::fs::write(&path, fixture_json().to_string()).unwrap();
    let source = FixtureSource::from_file(&path).unwrap();

    let request = BulkRequest {
        class_id: "jss2a".into(),
        class_name: "JSS 2A".into(),
        template_id: None,
        school: source.data().school.clone(),
        term: source.data().term.clone().unwrap(),
    };
    let generator = BulkGenerator::new(
        Arc::new(source),
        ImageResolver::new(reqwest::Client::new()),
        BulkConfig {
            concurrency: 2,
            scale: 0.5,
            ..Default::default()
        },
    );

    let seen = Mutex::new(Vec::new());
    let output = generator
        .generate(&[standard_template()], &request, &|p| {
            seen.lock().unwrap().push(p.student_name);
        })
        .await
        .unwrap();

    assert_eq!(output.file_name, "JSS_2A_report_cards.pdf");
    assert_eq!(output.pages, 2);
    assert_eq!(output.degraded, 0);
    assert!(output.pdf.starts_with(b"%PDF"));
    assert_eq!(*seen.lock().unwrap(), vec!["Ada Obi", "Zed Musa"]);
}

#[tokio::test]
async fn bulk_pages_carry_student_tables() {
    let generator = BulkGenerator::new(
        Arc::new(fixture()),
        ImageResolver::new(reqwest::Client::new()),
        BulkConfig::default(),
    );
    let request = BulkRequest {
        class_id: "jss2a".into(),
        class_name: "JSS 2A".into(),
        term: fixture().data().term.clone().unwrap(),
        ..Default::default()
    };
    let pages = generator
        .prepare(&standard_template(), &request, &|_| {})
        .await
        .unwrap();

    let ada = &pages[0];
    assert_eq!(ada.student.name, "Ada Obi");
    let grade_table = ada
        .template
        .elements
        .iter()
        .find(|el| matches!(el.kind, ElementKind::GradeTable(_)))
        .unwrap();
    assert!(grade_table.data.is_some());

    let rendered = ada
        .template
        .render_page(Some(&ada.context), PageView::preview(), &Default::default());
    let text = rendered.text_content();
    // CA + Exam summed, graded against the fixture's scale
    assert!(text.contains(&"Mathematics 30 52 82 A Excellent".to_string()), "{:?}", text);
    assert!(text.contains(&"English 20 35 55 C Credit".to_string()), "{:?}", text);
    assert!(text.contains(&"Percentage: 68.5%".to_string()));
}
