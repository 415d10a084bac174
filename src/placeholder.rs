//! Placeholder substitution for free-text elements.
//!
//! Bracketed tokens such as `[Student Name]` are replaced by context values,
//! or by fixed sample values when no context (or no such field) is present,
//! so the editor always shows plausible content.
//!
//! Matching is case-insensitive and ignores whitespace just inside the
//! brackets. Replacement is a single left-to-right pass: substituted values
//! are never scanned again, so a value that happens to look like a token is
//! printed literally. Unknown tokens are left as written.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::context::RendererContext;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]]+)\]").unwrap_or_else(|_| unreachable!("static token pattern"))
});

/// Recognized placeholder tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    SchoolName,
    SchoolAddress,
    SchoolMotto,
    StudentName,
    AdmissionNumber,
    ClassName,
    RollNumber,
    AcademicYear,
    Term,
    TotalScore,
    MaxScore,
    Percentage,
    Position,
    Result,
    Present,
    Absent,
    TotalDays,
    NextTermDate,
    Date,
}

impl Token {
    pub const ALL: [Token; 19] = [
        Token::SchoolName,
        Token::SchoolAddress,
        Token::SchoolMotto,
        Token::StudentName,
        Token::AdmissionNumber,
        Token::ClassName,
        Token::RollNumber,
        Token::AcademicYear,
        Token::Term,
        Token::TotalScore,
        Token::MaxScore,
        Token::Percentage,
        Token::Position,
        Token::Result,
        Token::Present,
        Token::Absent,
        Token::TotalDays,
        Token::NextTermDate,
        Token::Date,
    ];

    /// Canonical spelling, without brackets.
    pub fn name(self) -> &'static str {
        match self {
            Token::SchoolName => "School Name",
            Token::SchoolAddress => "School Address",
            Token::SchoolMotto => "School Motto",
            Token::StudentName => "Student Name",
            Token::AdmissionNumber => "Admission Number",
            Token::ClassName => "Class Name",
            Token::RollNumber => "Roll Number",
            Token::AcademicYear => "Academic Year",
            Token::Term => "Term",
            Token::TotalScore => "Total Score",
            Token::MaxScore => "Max Score",
            Token::Percentage => "Percentage",
            Token::Position => "Position",
            Token::Result => "Result",
            Token::Present => "Present",
            Token::Absent => "Absent",
            Token::TotalDays => "Total Days",
            Token::NextTermDate => "Next Term Date",
            Token::Date => "Date",
        }
    }

    /// Parse the text between brackets.
    pub fn parse(inner: &str) -> Option<Token> {
        let wanted = inner.trim();
        Token::ALL
            .into_iter()
            .find(|token| token.name().eq_ignore_ascii_case(wanted))
    }

    /// Value shown when the context does not supply one.
    pub fn sample(self) -> String {
        match self {
            Token::SchoolName => "GREENFIELD SECONDARY SCHOOL".into(),
            Token::SchoolAddress => "12 Unity Road, Springfield".into(),
            Token::SchoolMotto => "Knowledge and Character".into(),
            Token::StudentName => "John Doe".into(),
            Token::AdmissionNumber => "GSS/2024/001".into(),
            Token::ClassName => "JSS 2A".into(),
            Token::RollNumber => "001".into(),
            Token::AcademicYear => "2024/2025".into(),
            Token::Term => "First Term".into(),
            Token::TotalScore => "785".into(),
            Token::MaxScore => "900".into(),
            Token::Percentage => "87.2%".into(),
            Token::Position => "3rd".into(),
            Token::Result => "PROMOTED".into(),
            Token::Present => "58".into(),
            Token::Absent => "4".into(),
            Token::TotalDays => "62".into(),
            Token::NextTermDate => "January 8, 2025".into(),
            Token::Date => today(),
        }
    }

    /// Value from the context, if the relevant field is set.
    pub fn lookup(self, ctx: &RendererContext) -> Option<String> {
        let school = &ctx.school;
        let student = &ctx.student;
        let academic = &ctx.academic;
        match self {
            Token::SchoolName => school.school_name.clone(),
            Token::SchoolAddress => school.address.clone(),
            Token::SchoolMotto => school.motto.clone(),
            Token::StudentName => student.name.clone(),
            Token::AdmissionNumber => student.admission_number.clone(),
            Token::ClassName => student.class_name.clone(),
            Token::RollNumber => student.roll_number.clone(),
            Token::AcademicYear => academic.academic_year.clone(),
            Token::Term => academic.term.clone(),
            Token::TotalScore => academic.total_score.map(format_number),
            Token::MaxScore => academic.max_score.map(format_number),
            Token::Percentage => academic.percentage.map(|p| format!("{:.1}%", p)),
            Token::Position => academic.position.clone(),
            Token::Result => academic.result.clone(),
            Token::Present => ctx.attendance.map(|a| a.present.to_string()),
            Token::Absent => ctx.attendance.map(|a| a.absent.to_string()),
            Token::TotalDays => ctx.attendance.map(|a| a.total_days.to_string()),
            Token::NextTermDate => academic.next_term_date.clone(),
            Token::Date => None,
        }
    }
}

/// Replace every recognized token in `content`.
pub fn substitute(content: &str, ctx: Option<&RendererContext>) -> String {
    TOKEN_RE
        .replace_all(content, |caps: &Captures| {
            match Token::parse(&caps[1]) {
                Some(token) => ctx
                    .and_then(|c| token.lookup(c))
                    .unwrap_or_else(|| token.sample()),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Recognized tokens appearing in `content`, in order.
pub fn tokens_in(content: &str) -> Vec<Token> {
    TOKEN_RE
        .captures_iter(content)
        .filter_map(|caps| Token::parse(&caps[1]))
        .collect()
}

/// Whole numbers without a trailing `.0`, others with one decimal.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn today() -> String {
    chrono::Local::now().format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AcademicSummary, AttendanceSummary, SchoolInfo, StudentInfo};

    fn all_tokens_text() -> String {
        Token::ALL
            .iter()
            .map(|t| format!("[{}]", t.name()))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn full_context() -> RendererContext {
        RendererContext {
            school: SchoolInfo {
                school_name: Some("Test Academy".into()),
                address: Some("1 Main St".into()),
                motto: Some("Excel".into()),
                logo_url: None,
            },
            student: StudentInfo {
                name: Some("Ada Obi".into()),
                admission_number: Some("A10".into()),
                class_name: Some("SS1".into()),
                roll_number: Some("7".into()),
            },
            academic: AcademicSummary {
                academic_year: Some("2025/2026".into()),
                term: Some("Second Term".into()),
                total_score: Some(640.0),
                max_score: Some(800.0),
                percentage: Some(80.0),
                position: Some("1st".into()),
                result: Some("PASSED".into()),
                next_term_date: Some("May 2, 2026".into()),
            },
            attendance: Some(AttendanceSummary {
                present: 50,
                absent: 2,
                late: 1,
                total_days: 52,
            }),
            grade_template: None,
        }
    }

    #[test]
    fn full_context_leaves_no_recognized_tokens() {
        let out = substitute(&all_tokens_text(), Some(&full_context()));
        assert!(tokens_in(&out).is_empty(), "left tokens in {}", out);
        assert!(out.contains("Test Academy"));
        assert!(out.contains("80.0%"));
        assert!(out.contains("640"));
    }

    #[test]
    fn empty_context_yields_samples() {
        for token in Token::ALL {
            if token == Token::Date {
                continue;
            }
            let raw = format!("[{}]", token.name());
            assert_eq!(substitute(&raw, None), token.sample());
            assert_eq!(
                substitute(&raw, Some(&RendererContext::default())),
                token.sample()
            );
        }
    }

    #[test]
    fn case_insensitive_and_trimmed() {
        assert_eq!(
            substitute("[school name]", None),
            "GREENFIELD SECONDARY SCHOOL"
        );
        assert_eq!(substitute("[ STUDENT NAME ]", None), "John Doe");
    }

    #[test]
    fn unknown_tokens_are_verbatim() {
        assert_eq!(
            substitute("Dear [Parent Name], [Term]", None),
            "Dear [Parent Name], First Term"
        );
        assert_eq!(substitute("[]", None), "[]");
    }

    #[test]
    fn replacement_values_are_not_rescanned() {
        let mut ctx = RendererContext::default();
        ctx.student.name = Some("[Term]".into());
        assert_eq!(substitute("[Student Name]", Some(&ctx)), "[Term]");
    }

    #[test]
    fn school_name_example() {
        let ctx: RendererContext =
            serde_json::from_str(r#"{"school": {"schoolName": "Test Academy"}}"#).unwrap();
        assert_eq!(substitute("[School Name]", Some(&ctx)), "Test Academy");
        assert_eq!(
            substitute("[School Name]", None),
            "GREENFIELD SECONDARY SCHOOL"
        );
    }

    #[test]
    fn format_number_trims_whole_values() {
        assert_eq!(format_number(785.0), "785");
        assert_eq!(format_number(72.25), "72.2");
    }
}
