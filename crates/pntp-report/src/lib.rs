//! Report generation: the non-compliance summary of an assessment as a PDF.

mod layout;
mod pdf;
mod sanitize;

pub use layout::{Line, LineStyle, ReportLayout, build_layout};
pub use pdf::render_pdf;
pub use sanitize::sanitize;

use pntp_core::{AssessmentRecord, ValidationError, report_file_name};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot report on record: {0}")]
    Validation(#[from] ValidationError),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

/// A rendered report ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub file_name: String,
    pub layout: ReportLayout,
    pub bytes: Vec<u8>,
}

/// Lay out and render the report for `record`.
///
/// A record with no non-compliant criteria produces the header only.
pub fn generate(record: &AssessmentRecord) -> Result<GeneratedReport, ReportError> {
    record.validate()?;
    let layout = build_layout(record);
    let bytes = render_pdf(&layout)?;
    let file_name = report_file_name(&record.entity_name, record.entity_type);
    info!(
        file = %file_name,
        topics = layout.topic_count(),
        criteria = layout.criterion_count(),
        bytes = bytes.len(),
        "generated report"
    );
    Ok(GeneratedReport {
        file_name,
        layout,
        bytes,
    })
}
