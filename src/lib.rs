//! Filing confirmation PDFs to pre-filled remittance reports
//!
//! This crate provides:
//! - PDF text extraction, plain and position-aware, via lopdf
//! - Trigger-chain field parsing of confirmation text
//! - Surcharge table reconstruction from positioned text
//! - Excel template filling with merged-range handling and logo attach
//! - Batch conversion of many PDFs into one ZIP archive

pub mod batch;
pub mod extractor;
pub mod fields;
pub mod report;
pub mod tables;

pub use batch::{convert_batch, BatchInput, BatchOptions, BatchOutcome, FileReport};
pub use extractor::{
    extract_text, extract_text_items, extract_text_items_mem, extract_text_mem, TextItem,
};
pub use fields::{parse_amount, parse_fields, ParsedFields};
pub use report::{fill_report, Certification, ContactInfo, FilledReport, CONTACT_INFO};
pub use tables::{extract_surcharge_rows, SurchargeRow};

use std::path::Path;

/// One converted confirmation document
#[derive(Debug)]
pub struct ConfirmationReport {
    /// Serialized xlsx bytes of the filled report
    pub workbook: Vec<u8>,
    /// Fields parsed from the confirmation text
    pub fields: ParsedFields,
    /// Surcharge rows in document order
    pub surcharges: Vec<SurchargeRow>,
    /// Whether the logo image was found and anchored
    pub logo_attached: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Convert one confirmation PDF into a filled report.
///
/// This function will:
/// 1. Extract the document's plain text (page order preserved)
/// 2. Parse labeled fields from the text
/// 3. Reconstruct surcharge table rows from positioned text
/// 4. Fill a fresh parse of the template and serialize it
pub fn process_confirmation(
    pdf: &[u8],
    template: &[u8],
    certification: &Certification,
    logo_path: Option<&Path>,
) -> Result<ConfirmationReport, ConvertError> {
    let start = std::time::Instant::now();

    let text = extractor::extract_text_mem(pdf)?;
    let fields = fields::parse_fields(&text);

    let items = extractor::extract_text_items_mem(pdf)?;
    let surcharges = tables::extract_surcharge_rows(&items);

    let filled = report::fill_report(template, &fields, &surcharges, certification, logo_path)?;

    Ok(ConfirmationReport {
        workbook: filled.workbook,
        fields,
        surcharges,
        logo_attached: filled.logo_attached,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Pdf(String),
    #[error("template error: {0}")]
    Template(String),
    #[error("workbook error: {0}")]
    Workbook(String),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl From<lopdf::Error> for ConvertError {
    fn from(e: lopdf::Error) -> Self {
        ConvertError::Pdf(e.to_string())
    }
}
