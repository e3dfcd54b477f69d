//! Remittance report template filling
//!
//! The report template is a fixed xlsx workbook whose layout never changes:
//! every value lands at a predetermined address on the first worksheet.
//! Merged ranges covering a write target are removed first, because the
//! format drops writes to non-anchor cells of a live merge. The merge state
//! is not restored after writing.

use crate::fields::{self, ParsedFields};
use crate::tables::SurchargeRow;
use crate::ConvertError;
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::structs::Image;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Filing-desk contact block, identical on every report.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    pub name: &'static str,
    pub phone: &'static str,
    pub fax: &'static str,
    pub email: &'static str,
}

pub const CONTACT_INFO: ContactInfo = ContactInfo {
    name: "Seth Tenore",
    phone: "877-780-4848",
    fax: "506-675-8989",
    email: "communicationonlinefiling@avalara.com",
};

/// Preparer certification, supplied once per batch and stamped on every
/// output identically.
#[derive(Debug, Clone, Default)]
pub struct Certification {
    pub initials: String,
    pub title: String,
    pub full_name: String,
    pub date: String,
}

/// Cell addresses for parsed fields on the first worksheet. Fields absent
/// from the parse are written as empty strings.
pub const FIELD_CELLS: [(&str, &str); 12] = [
    (fields::COMPANY, "C6"),
    (fields::PROVIDER_NAME, "C7"),
    (fields::FEDERAL_TAX_ID, "C8"),
    (fields::CUSTOMER_ID, "C9"),
    (fields::ADDRESS_LINE_1, "C10"),
    (fields::ADDRESS_LINE_2, "C11"),
    (fields::STATE, "F6"),
    (fields::FORM, "F7"),
    (fields::REGISTRATION_ID, "F8"),
    (fields::FILING_PERIOD, "F9"),
    (fields::FILING_DATE, "F10"),
    (fields::PERIOD_ENDING, "F11"),
];

/// Payment amount cell, written as a number rather than text.
pub const PAYMENT_CELL: &str = "F13";

/// Surcharge layout: months one through three in columns B/C/D, months four
/// through six in columns E/F/G, both spanning rows 17 to 19.
pub const SURCHARGE_ROW_FIRST: u32 = 17;
pub const SURCHARGE_ROWS_PER_SECTION: usize = 3;
pub const SURCHARGE_SECTION_COLS: [[&str; 3]; 2] = [["B", "C", "D"], ["E", "F", "G"]];

/// Contact block cells (name, phone, fax, e-mail).
pub const CONTACT_CELLS: [&str; 4] = ["C22", "C23", "C24", "C25"];

/// Certification block cells (full name, title, initials, date).
pub const CERT_CELLS: [&str; 4] = ["C28", "C29", "C30", "C31"];

/// Anchor cell for the logo image.
pub const LOGO_ANCHOR: &str = "A1";

/// A filled report plus the logo outcome the caller records.
#[derive(Debug)]
pub struct FilledReport {
    /// Serialized xlsx bytes.
    pub workbook: Vec<u8>,
    /// Whether the logo image was found and anchored.
    pub logo_attached: bool,
}

/// Parse template workbook bytes. The template lives outside the program
/// and is re-read per output file; corrupt bytes fail here.
pub fn read_template(template: &[u8]) -> Result<Spreadsheet, ConvertError> {
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(template), true)
        .map_err(|e| ConvertError::Template(e.to_string()))
}

/// Fill one report from a fresh template parse.
pub fn fill_report(
    template: &[u8],
    parsed: &ParsedFields,
    surcharges: &[SurchargeRow],
    certification: &Certification,
    logo_path: Option<&Path>,
) -> Result<FilledReport, ConvertError> {
    let mut book = read_template(template)?;
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| ConvertError::Template("workbook has no sheets".to_string()))?;

    unmerge_write_targets(sheet);

    for (key, cell) in FIELD_CELLS {
        sheet
            .get_cell_mut(cell)
            .set_value_string(parsed.get_or_empty(key));
    }
    sheet
        .get_cell_mut(PAYMENT_CELL)
        .set_value_number(parsed.payment_amount());

    write_surcharge_sections(sheet, surcharges);

    let contact_values = [
        CONTACT_INFO.name,
        CONTACT_INFO.phone,
        CONTACT_INFO.fax,
        CONTACT_INFO.email,
    ];
    for (cell, value) in CONTACT_CELLS.iter().zip(contact_values) {
        sheet.get_cell_mut(*cell).set_value_string(value);
    }

    let cert_values = [
        certification.full_name.as_str(),
        certification.title.as_str(),
        certification.initials.as_str(),
        certification.date.as_str(),
    ];
    for (cell, value) in CERT_CELLS.iter().zip(cert_values) {
        sheet.get_cell_mut(*cell).set_value_string(value);
    }

    let logo_attached = match logo_path {
        Some(path) => attach_logo(sheet, path),
        None => false,
    };

    let workbook = write_workbook(&book)?;
    Ok(FilledReport {
        workbook,
        logo_attached,
    })
}

/// Serialize a workbook to xlsx bytes.
fn write_workbook(book: &Spreadsheet) -> Result<Vec<u8>, ConvertError> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|e| ConvertError::Workbook(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Every absolute address the fill writes to.
fn write_targets() -> Vec<String> {
    let mut targets: Vec<String> = FIELD_CELLS.iter().map(|(_, c)| (*c).to_string()).collect();
    targets.push(PAYMENT_CELL.to_string());
    for cols in SURCHARGE_SECTION_COLS {
        for col in cols {
            for offset in 0..SURCHARGE_ROWS_PER_SECTION {
                targets.push(format!("{}{}", col, SURCHARGE_ROW_FIRST + offset as u32));
            }
        }
    }
    targets.extend(CONTACT_CELLS.iter().map(|c| (*c).to_string()));
    targets.extend(CERT_CELLS.iter().map(|c| (*c).to_string()));
    targets
}

/// Remove merged ranges covering any write target. The merge is gone from
/// the output; writes land on what used to be the anchor.
fn unmerge_write_targets(sheet: &mut Worksheet) {
    let targets = write_targets();
    sheet.get_merge_cells_mut().retain(|range| {
        let covers_target = targets
            .iter()
            .any(|cell| range_contains(&range.get_range(), cell));
        if covers_target {
            log::debug!("removing merged range {} before writing", range.get_range());
        }
        !covers_target
    });
}

/// Write surcharge rows: the first three into section one, the next three
/// into section two. Short tables fill fewer rows; rows past six are
/// dropped.
fn write_surcharge_sections(sheet: &mut Worksheet, surcharges: &[SurchargeRow]) {
    let capacity = SURCHARGE_SECTION_COLS.len() * SURCHARGE_ROWS_PER_SECTION;
    for (i, row) in surcharges.iter().take(capacity).enumerate() {
        let cols = SURCHARGE_SECTION_COLS[i / SURCHARGE_ROWS_PER_SECTION];
        let line = SURCHARGE_ROW_FIRST + (i % SURCHARGE_ROWS_PER_SECTION) as u32;

        sheet
            .get_cell_mut(format!("{}{}", cols[0], line).as_str())
            .set_value_string(row.month.as_str());
        sheet
            .get_cell_mut(format!("{}{}", cols[1], line).as_str())
            .set_value_number(row.assessed);
        sheet
            .get_cell_mut(format!("{}{}", cols[2], line).as_str())
            .set_value_number(row.collected);
    }
}

/// Anchor the logo image on the sheet. Best-effort: a missing or unreadable
/// path reports failure without touching the workbook, and the caller does
/// not treat failure as an error.
fn attach_logo(sheet: &mut Worksheet, path: &Path) -> bool {
    if !path.is_file() {
        log::debug!("logo not found at {}, skipping", path.display());
        return false;
    }
    let path_str = match path.to_str() {
        Some(s) => s,
        None => return false,
    };

    let mut marker = MarkerType::default();
    marker.set_coordinate(LOGO_ANCHOR);
    let mut image = Image::default();
    image.new_image(path_str, marker);
    sheet.add_image(image);
    true
}

/// Column letters to a 1-based index ("A" -> 1, "AA" -> 27).
fn col_letters_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
    }
    Some(index)
}

/// Parse an A1 cell reference into 1-based (column, row).
fn parse_cell_ref(cell: &str) -> Option<(u32, u32)> {
    let digits_at = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(digits_at);
    let col = col_letters_to_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    Some((col, row))
}

/// Whether an A1 range ("B2:D5", or a bare cell) contains the given cell.
fn range_contains(range: &str, cell: &str) -> bool {
    let (start, end) = match range.split_once(':') {
        Some((s, e)) => (s, e),
        None => (range, range),
    };

    match (
        parse_cell_ref(cell),
        parse_cell_ref(start.trim()),
        parse_cell_ref(end.trim()),
    ) {
        (Some((col, row)), Some((c1, r1)), Some((c2, r2))) => {
            let (col_min, col_max) = (c1.min(c2), c1.max(c2));
            let (row_min, row_max) = (r1.min(r2), r1.max(r2));
            col >= col_min && col <= col_max && row >= row_min && row <= row_max
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ParsedFields;

    #[test]
    fn test_col_letters_to_index() {
        assert_eq!(col_letters_to_index("A"), Some(1));
        assert_eq!(col_letters_to_index("F"), Some(6));
        assert_eq!(col_letters_to_index("Z"), Some(26));
        assert_eq!(col_letters_to_index("AA"), Some(27));
        assert_eq!(col_letters_to_index(""), None);
        assert_eq!(col_letters_to_index("A1"), None);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("C6"), Some((3, 6)));
        assert_eq!(parse_cell_ref("F13"), Some((6, 13)));
        assert_eq!(parse_cell_ref("AB10"), Some((28, 10)));
        assert_eq!(parse_cell_ref("17"), None);
        assert_eq!(parse_cell_ref("C"), None);
    }

    #[test]
    fn test_range_contains() {
        assert!(range_contains("B2:D5", "C3"));
        assert!(range_contains("B2:D5", "B2"));
        assert!(range_contains("B2:D5", "D5"));
        assert!(!range_contains("B2:D5", "E2"));
        assert!(!range_contains("B2:D5", "C6"));
        // Single-cell range
        assert!(range_contains("C6", "C6"));
        assert!(!range_contains("C6", "C7"));
    }

    #[test]
    fn test_write_targets_cover_all_blocks() {
        let targets = write_targets();
        assert!(targets.contains(&"C6".to_string()));
        assert!(targets.contains(&"F13".to_string()));
        assert!(targets.contains(&"B17".to_string()));
        assert!(targets.contains(&"G19".to_string()));
        assert!(targets.contains(&"C25".to_string()));
        assert!(targets.contains(&"C31".to_string()));
    }

    #[test]
    fn test_fill_report_writes_fields_and_unmerges() {
        // Template with a merged range over the company cell
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.add_merge_cells("C6:D6");
        let template = write_workbook(&book).unwrap();

        let mut parsed = ParsedFields::new();
        parsed.set(fields::COMPANY, "Acme Telecom Inc.");
        parsed.set(fields::PAYMENT_AMOUNT, "$1,234.56 due");

        let certification = Certification {
            initials: "JD".to_string(),
            title: "Controller".to_string(),
            full_name: "Jane Doe".to_string(),
            date: "04/15/2024".to_string(),
        };

        let report = fill_report(&template, &parsed, &[], &certification, None).unwrap();
        assert!(!report.logo_attached);

        let filled = read_template(&report.workbook).unwrap();
        let sheet = filled.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_value("C6"), "Acme Telecom Inc.");
        assert_eq!(sheet.get_value("F13").parse::<f64>().unwrap(), 1234.56);
        // Absent fields become empty strings, not leftovers
        assert_eq!(sheet.get_value("C7"), "");
        // Contact and certification blocks
        assert_eq!(sheet.get_value("C22"), "Seth Tenore");
        assert_eq!(sheet.get_value("C28"), "Jane Doe");
        assert_eq!(sheet.get_value("C30"), "JD");
        // The merged range covering C6 is gone and not restored
        assert!(sheet.get_merge_cells().is_empty());
    }

    #[test]
    fn test_surcharge_sections_split_after_three_rows() {
        let book = umya_spreadsheet::new_file();
        let template = write_workbook(&book).unwrap();

        let rows: Vec<SurchargeRow> = [
            ("January", 10.0, 9.0),
            ("February", 20.0, 18.0),
            ("March", 30.0, 27.0),
            ("April", 40.0, 36.0),
        ]
        .iter()
        .map(|(m, a, c)| SurchargeRow {
            month: m.to_string(),
            assessed: *a,
            collected: *c,
        })
        .collect();

        let report =
            fill_report(&template, &ParsedFields::new(), &rows, &Certification::default(), None)
                .unwrap();
        let filled = read_template(&report.workbook).unwrap();
        let sheet = filled.get_sheet(&0).unwrap();

        assert_eq!(sheet.get_value("B17"), "January");
        assert_eq!(sheet.get_value("B19"), "March");
        // Fourth row starts section two
        assert_eq!(sheet.get_value("E17"), "April");
        assert_eq!(sheet.get_value("F17").parse::<f64>().unwrap(), 40.0);
        // Section two rows beyond the fourth month stay empty
        assert_eq!(sheet.get_value("E18"), "");
    }
}
