//! Batch conversion and archive assembly
//!
//! Inputs are processed one at a time, each against a fresh read of the
//! template file so no mutation carries across outputs. A file whose
//! extraction or fill fails still produces an archive entry (a template
//! filled with empty fields) so the archive always holds one entry per
//! input; the failure is recorded on that file's report.

use crate::report::{self, Certification};
use crate::{fields::ParsedFields, process_confirmation, ConvertError};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Default location of the report template, relative to the working
/// directory.
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/remittance_template.xlsx";

/// Default location of the logo image. Missing is fine; the logo is
/// best-effort.
pub const DEFAULT_LOGO_PATH: &str = "assets/logo.png";

/// Conventional name for the output archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "converted_excels.zip";

/// One uploaded confirmation: the name it arrived under plus its bytes.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub name: String,
    pub data: Vec<u8>,
}

impl BatchInput {
    /// Read a confirmation from disk, keeping the file name as the input
    /// name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let data = fs::read(path)?;
        Ok(Self { name, data })
    }
}

/// Per-batch configuration: where the template and logo live, and the
/// certification stamped on every output.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub template_path: PathBuf,
    pub logo_path: PathBuf,
    pub certification: Certification,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            logo_path: PathBuf::from(DEFAULT_LOGO_PATH),
            certification: Certification::default(),
        }
    }
}

/// Outcome for one input file.
#[derive(Debug)]
pub struct FileReport {
    /// The name the input arrived under.
    pub input_name: String,
    /// Archive entry written for this input.
    pub entry_name: String,
    /// Error text when processing failed; the entry then holds an
    /// empty-field report.
    pub error: Option<String>,
    /// Whether the logo was attached to this entry's workbook.
    pub logo_attached: bool,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole batch: the archive bytes plus one report per input,
/// in input order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub archive: Vec<u8>,
    pub reports: Vec<FileReport>,
}

impl BatchOutcome {
    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.succeeded()).count()
    }
}

/// Archive entry name for an input: base name with the extension replaced
/// by `.xlsx`.
pub fn entry_name(input_name: &str) -> String {
    let path = Path::new(input_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_name.to_string());
    format!("{}.xlsx", stem)
}

/// Convert every input and collect the filled reports into a ZIP archive.
///
/// The template is validated up front; an unreadable or unparsable template
/// fails the whole batch. Per-file processing failures do not: the file's
/// entry is written from a template filled with empty fields and the error
/// is carried on its [`FileReport`].
pub fn convert_batch(
    inputs: &[BatchInput],
    options: &BatchOptions,
) -> Result<BatchOutcome, ConvertError> {
    let probe = fs::read(&options.template_path).map_err(|e| {
        ConvertError::Template(format!(
            "cannot read template {}: {}",
            options.template_path.display(),
            e
        ))
    })?;
    report::read_template(&probe)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let zip_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut reports = Vec::with_capacity(inputs.len());

    for input in inputs {
        // Fresh template read per file, so one output's mutations cannot
        // bleed into the next.
        let template = fs::read(&options.template_path).map_err(|e| {
            ConvertError::Template(format!(
                "cannot read template {}: {}",
                options.template_path.display(),
                e
            ))
        })?;

        let entry = entry_name(&input.name);
        let (workbook, logo_attached, error) = match process_confirmation(
            &input.data,
            &template,
            &options.certification,
            Some(&options.logo_path),
        ) {
            Ok(converted) => (converted.workbook, converted.logo_attached, None),
            Err(e) => {
                log::warn!("{}: {}", input.name, e);
                // The archive still gains an entry for this input: the
                // template with empty fields and the batch certification.
                let blank = report::fill_report(
                    &template,
                    &ParsedFields::new(),
                    &[],
                    &options.certification,
                    Some(&options.logo_path),
                )?;
                (blank.workbook, blank.logo_attached, Some(e.to_string()))
            }
        };

        writer.start_file(entry.as_str(), zip_options)?;
        writer.write_all(&workbook)?;

        reports.push(FileReport {
            input_name: input.name.clone(),
            entry_name: entry,
            error,
            logo_attached,
        });
    }

    let archive = writer.finish()?.into_inner();
    Ok(BatchOutcome { archive, reports })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_replaces_extension() {
        assert_eq!(entry_name("confirmation.pdf"), "confirmation.xlsx");
        assert_eq!(entry_name("q2 filing.PDF"), "q2 filing.xlsx");
        assert_eq!(entry_name("noext"), "noext.xlsx");
        assert_eq!(entry_name("dir/nested.report.pdf"), "nested.report.xlsx");
    }

    #[test]
    fn test_default_options_paths() {
        let options = BatchOptions::default();
        assert_eq!(
            options.template_path,
            PathBuf::from("templates/remittance_template.xlsx")
        );
        assert_eq!(options.logo_path, PathBuf::from("assets/logo.png"));
    }

    #[test]
    fn test_missing_template_fails_batch() {
        let options = BatchOptions {
            template_path: PathBuf::from("no/such/template.xlsx"),
            ..Default::default()
        };
        let inputs = [BatchInput {
            name: "a.pdf".to_string(),
            data: Vec::new(),
        }];
        let err = convert_batch(&inputs, &options).unwrap_err();
        assert!(matches!(err, ConvertError::Template(_)));
    }
}
