//! Report exports of an analysis result.
//!
//! - `table`: shared initiative table model (rows, area columns, epic cards)
//! - `pdf`: A4 and wide PDF documents
//! - `html`: Confluence-compatible HTML fragment
//! - `keys`: plain-text key list of a backward check

pub mod html;
pub mod keys;
pub mod pdf;
pub mod table;

use crate::cache::AnalysisResult;
use crate::config::ViewerConfig;
use crate::errors::ViewerError;
use chrono::{DateTime, Utc};
use pdf::{LayoutOptions, PageFormat};
use std::str::FromStr;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Export formats offered for a cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// A4 landscape PDF with split views
    Pdf,
    /// A3 or wider PDF with every area in one table
    PdfWide,
    /// Confluence HTML fragment
    Html,
    /// Backward check keys as plain text
    TextKeys,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::PdfWide => "pdf-wide",
            ExportFormat::Html => "html",
            ExportFormat::TextKeys => "text-keys",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf | ExportFormat::PdfWide => "application/pdf",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::TextKeys => "text/plain; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "pdf-wide" | "pdf_wide" | "wide" => Ok(ExportFormat::PdfWide),
            "html" | "confluence" => Ok(ExportFormat::Html),
            "text-keys" | "text_keys" | "keys" => Ok(ExportFormat::TextKeys),
            other => Err(ViewerError::input(
                "format",
                format!(
                    "unknown export format '{}' (expected pdf, pdf-wide, html or text-keys)",
                    other
                ),
            )),
        }
    }
}

/// File-name safe form of a release name
fn sanitize_release(release: &str) -> String {
    let cleaned: String = release
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "all".to_string()
    } else {
        cleaned
    }
}

/// Download file name of an export.
///
/// `page_format` only matters for the wide PDF, where it names A3 or Wide.
pub fn export_filename(
    format: ExportFormat,
    release: &str,
    page_format: Option<PageFormat>,
    now: DateTime<Utc>,
) -> String {
    let release = sanitize_release(release);
    let ts = now.format(TIMESTAMP_FORMAT);
    match format {
        ExportFormat::Pdf => format!("Initiative_Report_{}_{}.pdf", release, ts),
        ExportFormat::PdfWide => {
            let size = page_format.unwrap_or(PageFormat::Wide).label();
            format!("Initiative_Report_{}_{}_{}.pdf", release, size, ts)
        }
        ExportFormat::Html => format!("Initiative_Report_Confluence_{}_{}.html", release, ts),
        ExportFormat::TextKeys => format!("Backward_Check_Keys_{}_{}.txt", release, ts),
    }
}

/// A rendered export ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render `result` in `format`.
///
/// Text keys exist only for backward check results.
pub fn render_export(
    result: &AnalysisResult,
    format: ExportFormat,
    config: &ViewerConfig,
    now: DateTime<Utc>,
) -> Result<RenderedExport, ViewerError> {
    let hierarchy = result.hierarchy();
    let completed = config.workflow.completed_statuses();

    let (bytes, page_format) = match format {
        ExportFormat::Pdf | ExportFormat::PdfWide => {
            let page_format = if format == ExportFormat::Pdf {
                PageFormat::A4
            } else {
                PageFormat::for_wide_export(hierarchy.all_areas().len())
            };
            let options = LayoutOptions {
                max_areas_per_view: config.report.max_areas_per_view(),
                completed_statuses: completed,
                generated_at: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            };
            let layout = pdf::layout_report(hierarchy, page_format, &options);
            (pdf::render_pdf(&layout)?, Some(page_format))
        }
        ExportFormat::Html => {
            let summary = result.backward_check().map(|r| &r.summary);
            let html = html::render_confluence(hierarchy, summary, &completed, now)?;
            (html.into_bytes(), None)
        }
        ExportFormat::TextKeys => {
            let backward = result.backward_check().ok_or_else(|| {
                ViewerError::input(
                    "format",
                    "text-keys export is only available for backward check results",
                )
            })?;
            (keys::render_keys(backward, now).into_bytes(), None)
        }
    };

    let filename = export_filename(format, &hierarchy.release, page_format, now);
    info!(
        "Rendered {} export {} ({} bytes)",
        format.as_str(),
        filename,
        bytes.len()
    );

    Ok(RenderedExport {
        filename,
        content_type: format.content_type(),
        bytes,
    })
}
