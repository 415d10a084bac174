//! Editor presets: geometry, style and starter content per element kind.
//!
//! Presets are laid out for a portrait A4 page (794×1123) so a template
//! built purely from defaults already reads like a report card.

use super::ElementKind;
use super::types::{BorderStyle, ElementStyle, FontStyle, FontWeight, TextAlign, TRANSPARENT};

/// Starting values for a newly added element.
pub struct Preset {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub style: ElementStyle,
    pub content: String,
}

impl Preset {
    fn at(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            style: ElementStyle::default(),
            content: String::new(),
        }
    }

    fn content(mut self, content: &str) -> Self {
        self.content = content.into();
        self
    }

    fn font(mut self, size: f32, weight: FontWeight) -> Self {
        self.style.font_size = size;
        self.style.font_weight = weight;
        self
    }

    fn align(mut self, align: TextAlign) -> Self {
        self.style.text_align = align;
        self
    }
}

/// Grade table height for a given number of preview rows.
pub fn grade_table_height(rows: u8) -> f32 {
    40.0 + f32::from(rows) * 35.0 + 20.0
}

/// Preset for an element kind.
pub fn preset_for(kind: &ElementKind) -> Preset {
    use FontWeight::{Bold, Normal};

    match kind {
        ElementKind::SchoolName(_) => {
            let mut p = Preset::at(50.0, 30.0, 694.0, 40.0)
                .content("[School Name]")
                .font(24.0, Bold)
                .align(TextAlign::Center);
            p.style.color = "#1e3a5f".into();
            p
        }
        ElementKind::SchoolAddress(_) => Preset::at(50.0, 74.0, 694.0, 24.0)
            .content("[School Address]")
            .font(12.0, Normal)
            .align(TextAlign::Center),
        ElementKind::SchoolMotto(_) => {
            let mut p = Preset::at(50.0, 98.0, 694.0, 22.0)
                .content("Motto: [School Motto]")
                .font(12.0, Normal)
                .align(TextAlign::Center);
            p.style.font_style = FontStyle::Italic;
            p
        }
        ElementKind::StudentName(_) => {
            Preset::at(50.0, 150.0, 340.0, 28.0).content("Name: [Student Name]")
        }
        ElementKind::ClassName(_) => {
            Preset::at(404.0, 150.0, 340.0, 28.0).content("Class: [Class Name]")
        }
        ElementKind::RollNumber(_) => {
            Preset::at(50.0, 182.0, 340.0, 28.0).content("Roll No: [Roll Number]")
        }
        ElementKind::AcademicYear(_) => {
            Preset::at(404.0, 182.0, 340.0, 28.0).content("Session: [Academic Year]")
        }
        ElementKind::Term(_) => Preset::at(50.0, 214.0, 340.0, 28.0).content("Term: [Term]"),
        ElementKind::TotalMarks(_) => {
            Preset::at(50.0, 500.0, 220.0, 28.0).content("Total: [Total Score] / [Max Score]")
        }
        ElementKind::Percentage(_) => {
            Preset::at(287.0, 500.0, 220.0, 28.0).content("Percentage: [Percentage]")
        }
        ElementKind::Position(_) => {
            Preset::at(524.0, 500.0, 220.0, 28.0).content("Position: [Position]")
        }
        ElementKind::Result(_) => Preset::at(50.0, 532.0, 220.0, 28.0)
            .content("Result: [Result]")
            .font(14.0, Bold),
        ElementKind::AttendanceSummary(_) => Preset::at(287.0, 532.0, 457.0, 28.0)
            .content("Attendance: [Present] of [Total Days] days"),
        ElementKind::NextTermDate(_) => Preset::at(50.0, 564.0, 400.0, 28.0)
            .content("Next term begins: [Next Term Date]"),
        ElementKind::Signature(_) => Preset::at(494.0, 1000.0, 250.0, 60.0)
            .content("Principal's Signature")
            .font(12.0, Normal)
            .align(TextAlign::Center),
        ElementKind::Watermark(_) => {
            let mut p = Preset::at(97.0, 480.0, 600.0, 120.0)
                .content("[School Name]")
                .font(48.0, Bold)
                .align(TextAlign::Center);
            p.rotation = -30.0;
            p.style.color = "#1e3a5f".into();
            p.style.opacity = 0.08;
            p
        }
        ElementKind::Text(_) => Preset::at(50.0, 260.0, 300.0, 30.0).content("Text"),
        ElementKind::GradeTable(props) => {
            Preset::at(50.0, 250.0, 694.0, grade_table_height(props.preview_rows))
                .content("Academic Performance")
                .font(12.0, Normal)
        }
        ElementKind::AttendanceTable(_) => Preset::at(50.0, 610.0, 340.0, 180.0)
            .content("Attendance")
            .font(12.0, Normal),
        ElementKind::BehaviorTable(_) => Preset::at(404.0, 610.0, 340.0, 160.0)
            .content("Behavior")
            .font(12.0, Normal),
        ElementKind::GradingScale(_) => Preset::at(50.0, 810.0, 340.0, 210.0)
            .content("Grading Scale")
            .font(11.0, Normal),
        ElementKind::SchoolLogo(_) => Preset::at(50.0, 30.0, 80.0, 80.0),
        ElementKind::Image(_) => Preset::at(624.0, 140.0, 120.0, 140.0),
        ElementKind::Line(_) => {
            let mut p = Preset::at(50.0, 128.0, 694.0, 2.0);
            p.style.border_width = 2.0;
            p.style.border_style = BorderStyle::Solid;
            p.style.border_color = "#1e3a5f".into();
            p.style.padding = 0.0;
            p
        }
        ElementKind::Shape(_) => {
            let mut p = Preset::at(40.0, 20.0, 714.0, 112.0);
            p.style.border_width = 2.0;
            p.style.border_style = BorderStyle::Solid;
            p.style.border_color = "#1e3a5f".into();
            p.style.border_radius = 8.0;
            p.style.background_color = TRANSPARENT.into();
            p
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_table_height_formula() {
        assert_eq!(grade_table_height(4), 200.0);
        assert_eq!(grade_table_height(1), 95.0);
        assert_eq!(grade_table_height(20), 760.0);
    }

    #[test]
    fn school_name_preset_is_centered_bold() {
        let p = preset_for(&ElementKind::SchoolName(Default::default()));
        assert_eq!(p.style.text_align, TextAlign::Center);
        assert_eq!(p.style.font_weight, FontWeight::Bold);
        assert_eq!(p.style.font_size, 24.0);
        assert!(p.width > 600.0);
    }
}
