//! Surcharge table extraction
//!
//! Confirmations carry a surcharge summary table with one row per month and
//! two amount columns (assessed, collected). Positioned text items are
//! grouped into rows, rows are split into cells on X gaps, and only rows
//! whose first cell is a month name and whose amount cells parse as numbers
//! are kept. Everything else in the table (headers, totals, captions) is
//! discarded.

use crate::extractor::{group_into_lines, TextItem, TextLine};

/// Month names accepted in the first table column.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One parsed surcharge table row.
#[derive(Debug, Clone, PartialEq)]
pub struct SurchargeRow {
    pub month: String,
    pub assessed: f64,
    pub collected: f64,
}

/// Extract surcharge rows from positioned text items, in document order
/// (page order, then stream order within the page).
pub fn extract_surcharge_rows(items: &[TextItem]) -> Vec<SurchargeRow> {
    let lines = group_into_lines(items.to_vec());

    lines
        .iter()
        .filter_map(|line| parse_surcharge_row(&split_into_cells(line)))
        .collect()
}

/// Split a line's items into cells. Items within the gap threshold belong to
/// the same cell (a currency symbol rendered as its own run, for example);
/// a larger gap starts the next column.
fn split_into_cells(line: &TextLine) -> Vec<String> {
    let cell_gap = 20.0;
    let mut cells: Vec<String> = Vec::new();
    let mut last_x: Option<f32> = None;

    for item in &line.items {
        let text = item.text.trim();
        if text.is_empty() {
            continue;
        }

        match (last_x, cells.last_mut()) {
            (Some(prev_x), Some(cell)) if item.x - prev_x <= cell_gap => {
                cell.push(' ');
                cell.push_str(text);
            }
            _ => cells.push(text.to_string()),
        }
        last_x = Some(item.x);
    }

    cells
}

/// Keep a row only when its first cell is a month name and both amount
/// cells parse; anything else is dropped without error.
fn parse_surcharge_row(cells: &[String]) -> Option<SurchargeRow> {
    if cells.len() < 3 {
        return None;
    }

    let month = cells[0].trim();
    if !MONTH_NAMES.contains(&month) {
        return None;
    }

    match (parse_cell_amount(&cells[1]), parse_cell_amount(&cells[2])) {
        (Some(assessed), Some(collected)) => Some(SurchargeRow {
            month: month.to_string(),
            assessed,
            collected,
        }),
        _ => {
            log::debug!("discarding surcharge row for {}: non-numeric amount cell", month);
            None
        }
    }
}

/// Parse a cell as a decimal amount after stripping currency symbols,
/// thousands separators, and spaces.
fn parse_cell_amount(cell: &str) -> Option<f64> {
    let cleaned = cell.replace('$', "").replace(',', "").replace(' ', "");
    cleaned.parse::<f64>().ok()
}
