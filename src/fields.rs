//! Field parsing from confirmation text
//!
//! Confirmations render each field as a label line followed by a value line.
//! The parser scans line-by-line: the first label substring found on a line
//! claims the next line as that field's value. Filer identity data never
//! appears as labeled fields and is injected from a lookup of known filers.

use regex::Regex;
use std::collections::BTreeMap;

/// Field keys, named after the labels they are scanned from.
pub const COMPANY: &str = "Company";
pub const FILING_PERIOD: &str = "Filing Period";
pub const FORM: &str = "Form";
pub const STATE: &str = "State";
pub const REGISTRATION_ID: &str = "Registration ID";
pub const FILING_DATE: &str = "Filing Date";
pub const PAYMENT_AMOUNT: &str = "Payment Amount";

/// Keys injected from the known-filer lookup rather than scanned.
pub const PROVIDER_NAME: &str = "Provider Name";
pub const FEDERAL_TAX_ID: &str = "Federal Tax ID";
pub const CUSTOMER_ID: &str = "Customer ID";
pub const ADDRESS_LINE_1: &str = "Address Line 1";
pub const ADDRESS_LINE_2: &str = "Address Line 2";
pub const PERIOD_ENDING: &str = "Period Ending";

/// Label triggers in priority order. Matching is substring containment and
/// only the first matching trigger on a line fires.
const TRIGGERS: [&str; 7] = [
    COMPANY,
    FILING_PERIOD,
    FORM,
    STATE,
    REGISTRATION_ID,
    FILING_DATE,
    PAYMENT_AMOUNT,
];

/// Date written for "Period Ending" when any line mentions the filing year.
/// Set once; later matches do not overwrite it.
const PERIOD_ENDING_TRIGGER: &str = "2024";
const PERIOD_ENDING_DEFAULT: &str = "12/31/2024";

/// A filer whose identity block appears only as free text in the
/// confirmation body. Detection is substring matching on single lines; the
/// injected values are fixed per filer. A more robust keying (tax ID,
/// registration ID) would go here if additional filers are onboarded.
struct KnownFiler {
    name: &'static str,
    /// Leading digits of the tax ID, required on the same line as the name.
    tax_id_hint: &'static str,
    federal_tax_id: &'static str,
    customer_id: &'static str,
    street_hint: &'static str,
    address_line_1: &'static str,
    locality_hint: &'static str,
    address_line_2: &'static str,
}

const KNOWN_FILERS: [KnownFiler; 1] = [KnownFiler {
    name: "Unified Communications LLC",
    tax_id_hint: "46",
    federal_tax_id: "46-2218745",
    customer_id: "1004476",
    street_hint: "Walter Road",
    address_line_1: "86 Walter Road",
    locality_hint: "Cochranville",
    address_line_2: "Cochranville, PA 19330",
}];

/// Parsed field values keyed by field name.
///
/// Keys missing from the scan stay absent; consumers read them back as empty
/// strings. Repeated trigger matches overwrite (last write wins) except
/// "Period Ending", which keeps its first value.
#[derive(Debug, Default, Clone)]
pub struct ParsedFields {
    values: BTreeMap<&'static str, String>,
}

impl ParsedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Absent keys read as empty string, matching what the report writes.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    fn set_if_absent(&mut self, key: &'static str, value: &str) {
        self.values.entry(key).or_insert_with(|| value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// The payment amount as a number, zero when missing or unparsable.
    pub fn payment_amount(&self) -> f64 {
        parse_amount(self.get_or_empty(PAYMENT_AMOUNT))
    }
}

/// Scan confirmation text for labeled fields.
pub fn parse_fields(text: &str) -> ParsedFields {
    let lines: Vec<&str> = text.lines().collect();
    let mut fields = ParsedFields::new();

    for (i, line) in lines.iter().enumerate() {
        // First matching label claims the next line. A label on the final
        // line has no value line and leaves the key absent.
        if let Some(trigger) = TRIGGERS.iter().copied().find(|t| line.contains(*t)) {
            if let Some(value) = lines.get(i + 1) {
                fields.set(trigger, value.trim());
            }
        }

        for filer in &KNOWN_FILERS {
            if line.contains(filer.name) && line.contains(filer.tax_id_hint) {
                fields.set(PROVIDER_NAME, filer.name);
                fields.set(FEDERAL_TAX_ID, filer.federal_tax_id);
                fields.set(CUSTOMER_ID, filer.customer_id);
            }
            if line.contains(filer.street_hint) {
                fields.set(ADDRESS_LINE_1, filer.address_line_1);
            }
            if line.contains(filer.locality_hint) {
                fields.set(ADDRESS_LINE_2, filer.address_line_2);
            }
        }

        if line.contains(PERIOD_ENDING_TRIGGER) {
            fields.set_if_absent(PERIOD_ENDING, PERIOD_ENDING_DEFAULT);
        }
    }

    fields
}

/// Extract the first decimal amount with exactly two fraction digits from
/// noisy text. Thousands separators are stripped before parsing; text with
/// no such amount yields zero.
pub fn parse_amount(text: &str) -> f64 {
    use once_cell::sync::Lazy;
    static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+\.\d{2}").unwrap());

    AMOUNT_RE
        .find(text)
        .map(|m| m.as_str().replace(',', ""))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}
