use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{html, pdf, Report, ReportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Html,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Html => "text/html; charset=utf-8",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "html" | "htm" => Ok(Self::Html),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// A single-file artifact ready to be saved or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloadable {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

/// `MindEase_Report_<YYYY-MM-DD>.<ext>`
pub fn report_filename(date: NaiveDate, format: ReportFormat) -> String {
    format!(
        "MindEase_Report_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Package `report` with today's local date in the filename.
pub fn to_downloadable(report: &Report, format: ReportFormat) -> Result<Downloadable, ReportError> {
    to_downloadable_on(report, format, Local::now().date_naive())
}

pub fn to_downloadable_on(
    report: &Report,
    format: ReportFormat,
    date: NaiveDate,
) -> Result<Downloadable, ReportError> {
    let bytes = match format {
        ReportFormat::Pdf => pdf::generate_pdf(report)?,
        ReportFormat::Html => html::generate_html(report).into_bytes(),
    };
    Ok(Downloadable {
        filename: report_filename(date, format),
        bytes,
        media_type: format.media_type(),
    })
}

/// Write the artifact into `dir` (created if needed). Returns the file path.
pub fn export_to_dir(download: &Downloadable, dir: &Path) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&download.filename);
    std::fs::write(&path, &download.bytes)?;
    tracing::info!(path = %path.display(), bytes = download.bytes.len(), "Report exported");
    Ok(path)
}
