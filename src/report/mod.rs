//! Assessment report: pure rendering plus PDF, HTML and plain-text output.
//!
//! [`render`] turns an [`Assessment`] into a [`Report`] with five sections in
//! fixed order. Everything it needs, including the "Generated on" line, comes
//! from the assessment itself, so the same assessment always yields the same
//! report.

pub mod export;
pub mod html;
pub mod layout;
pub mod pdf;

pub use export::*;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Assessment, Condition};

pub const REPORT_TITLE: &str = "MindEase-AI";
pub const REPORT_SUBTITLE: &str = "Mental Health Assessment Report";

const NO_CONDITION_SUMMARY: &str = "No specific mental health condition could be confidently identified from the reported symptoms. This is generally reassuring, but monitoring and self-care are still recommended.";
const SYMPTOMS_INTRO: &str = "The following key symptoms were identified:";
const NO_SYMPTOMS: &str = "No distinct symptoms were automatically detected in the conversation.";
const NO_DIFFERENTIAL: &str =
    "No specific mental health diagnoses are suggested at this time based on the available information.";
const SELF_CARE: &str = "Consider maintaining a healthy routine, monitoring your mood over time, and seeking professional support if symptoms persist or worsen.";
pub const DISCLAIMER: &str = "This document is generated by an AI system (MindEase-AI) for informational and educational purposes only. It is not a formal medical or psychiatric diagnosis. Clinical evaluation by a licensed mental health professional is essential before making any decisions about treatment or care. If you are in crisis or having thoughts of self-harm, please contact emergency services or a crisis helpline immediately.";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Export failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Summary,
    DetectedSymptoms,
    Differential,
    Recommendations,
    Disclaimer,
}

impl SectionKind {
    pub fn heading(self) -> &'static str {
        match self {
            Self::Summary => "Clinical Summary",
            Self::DetectedSymptoms => "Reported / Detected Symptoms",
            Self::Differential => "Differential Assessment",
            Self::Recommendations => "Clinical Recommendations",
            Self::Disclaimer => "Important Disclaimer",
        }
    }
}

/// How a line is set. Writers map styles to indentation and emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Paragraph,
    Bullet,
    /// Numbered entry ("1. ...").
    Item,
    /// Indented detail under an item.
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub style: LineStyle,
    pub text: String,
}

impl ReportLine {
    fn new(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub heading: String,
    pub lines: Vec<ReportLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub subtitle: String,
    pub generated_line: String,
    pub sections: Vec<ReportSection>,
}

impl Report {
    /// Plain-text rendering for copy/paste and terminal output.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&self.subtitle);
        out.push('\n');
        out.push_str(&self.generated_line);
        out.push('\n');

        for section in &self.sections {
            out.push('\n');
            out.push_str(&section.heading);
            out.push('\n');
            out.push_str(&"-".repeat(section.heading.chars().count()));
            out.push('\n');
            for line in &section.lines {
                out.push_str(&line.text);
                out.push('\n');
            }
        }
        out
    }
}

/// Render an assessment into the five-section report.
pub fn render(assessment: &Assessment) -> Report {
    let generated = assessment.created_at;
    Report {
        title: REPORT_TITLE.to_string(),
        subtitle: REPORT_SUBTITLE.to_string(),
        generated_line: format!(
            "Generated on {} at {} UTC",
            generated.format("%Y-%m-%d"),
            generated.format("%H:%M")
        ),
        sections: vec![
            section(SectionKind::Summary, summary_lines(assessment)),
            section(SectionKind::DetectedSymptoms, symptom_lines(&assessment.detected_symptoms)),
            section(SectionKind::Differential, differential_lines(&assessment.conditions)),
            section(SectionKind::Recommendations, recommendation_lines(&assessment.recommendations)),
            section(
                SectionKind::Disclaimer,
                vec![ReportLine::new(LineStyle::Paragraph, DISCLAIMER)],
            ),
        ],
    }
}

fn section(kind: SectionKind, lines: Vec<ReportLine>) -> ReportSection {
    ReportSection {
        kind,
        heading: kind.heading().to_string(),
        lines,
    }
}

fn summary_lines(assessment: &Assessment) -> Vec<ReportLine> {
    let Some(top) = assessment.top_condition() else {
        return vec![ReportLine::new(LineStyle::Paragraph, NO_CONDITION_SUMMARY)];
    };

    let mut lines = vec![ReportLine::new(
        LineStyle::Paragraph,
        format!(
            "Based on the reported symptoms, the most likely mental health concern is \"{}\" with an estimated match of {}%.",
            top.name, top.match_percentage
        ),
    )];
    if let Some(severity) = present(top.severity.as_deref()) {
        lines.push(ReportLine::new(
            LineStyle::Paragraph,
            format!("Overall severity is assessed as: {severity}."),
        ));
    }
    if let Some(description) = present(Some(top.description.as_str())) {
        lines.push(ReportLine::new(LineStyle::Paragraph, description));
    }
    lines
}

fn symptom_lines(symptoms: &[String]) -> Vec<ReportLine> {
    if symptoms.is_empty() {
        return vec![ReportLine::new(LineStyle::Paragraph, NO_SYMPTOMS)];
    }
    let mut lines = vec![ReportLine::new(LineStyle::Paragraph, SYMPTOMS_INTRO)];
    lines.extend(
        symptoms
            .iter()
            .map(|s| ReportLine::new(LineStyle::Bullet, format!("• {}", display_symptom(s)))),
    );
    lines
}

fn differential_lines(conditions: &[Condition]) -> Vec<ReportLine> {
    if conditions.is_empty() {
        return vec![ReportLine::new(LineStyle::Paragraph, NO_DIFFERENTIAL)];
    }
    let mut lines = Vec::new();
    for (i, condition) in conditions.iter().enumerate() {
        let severity = present(condition.severity.as_deref())
            .map(|s| format!(", {s} severity"))
            .unwrap_or_default();
        lines.push(ReportLine::new(
            LineStyle::Item,
            format!(
                "{}. {} ({}% match{})",
                i + 1,
                condition.name,
                condition.match_percentage,
                severity
            ),
        ));
        if let Some(description) = present(Some(condition.description.as_str())) {
            lines.push(ReportLine::new(
                LineStyle::Detail,
                format!("   Summary: {description}"),
            ));
        }
    }
    lines
}

fn recommendation_lines(recommendations: &[String]) -> Vec<ReportLine> {
    if recommendations.is_empty() {
        return vec![ReportLine::new(LineStyle::Paragraph, SELF_CARE)];
    }
    recommendations
        .iter()
        .enumerate()
        .map(|(i, rec)| ReportLine::new(LineStyle::Item, format!("{}. {}", i + 1, rec)))
        .collect()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// "sleep_problems" -> "Sleep problems"
pub fn display_symptom(token: &str) -> String {
    let clean = token.replace('_', " ");
    let mut chars = clean.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
