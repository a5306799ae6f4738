//! Maps property records to named form inputs and submitted inputs back to
//! cell edits. Names are derived from the static section table, never from
//! the labels in the file: `income.30` is the value cell of row 30 in the
//! income section, `our_offer.23.vendor` the vendor cell of row 23.

use super::{
    layout::{self, SECTIONS},
    models::{CellEdit, PropertyRecord, SectionKey, ValueColumn},
};
use std::collections::HashMap;

const VENDOR_SUFFIX: &str = "vendor";

/// Labels rendered as a textarea rather than a single-line input, in any
/// section. Everything in the questions section is multiline as well.
const MULTILINE_LABELS: [&str; 3] =
    ["Google Maps Link", "Notes", "Type of Property"];

#[derive(Clone, Debug, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub value: String,
    pub section: SectionKey,
    pub column: ValueColumn,
    pub multiline: bool,
}

pub fn field_name(section: SectionKey, row: u32, column: ValueColumn) -> String {
    match column {
        ValueColumn::Primary => format!("{section}.{row}"),
        ValueColumn::Vendor => format!("{section}.{row}.{VENDOR_SUFFIX}"),
    }
}

/// Inverse of [`field_name`]. Rejects unknown sections, rows outside the
/// section's range, and vendor cells on sections without a vendor column.
pub fn parse_field_name(name: &str) -> Option<(SectionKey, u32, ValueColumn)> {
    let mut parts = name.split('.');
    let section: SectionKey = parts.next()?.parse().ok()?;
    let row: u32 = parts.next()?.parse().ok()?;
    let column = match parts.next() {
        None => ValueColumn::Primary,
        Some(VENDOR_SUFFIX) => ValueColumn::Vendor,
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    let desc = layout::descriptor(section);
    if !desc.rows.contains(&row) || desc.column(column).is_none() {
        return None;
    }
    Some((section, row, column))
}

pub fn is_multiline(section: SectionKey, label: &str) -> bool {
    section == SectionKey::Questions || MULTILINE_LABELS.contains(&label)
}

/// Flatten a record into inputs, section by section in table order.
pub fn form_fields(record: &PropertyRecord) -> Vec<FormField> {
    let mut out = vec![];
    for section in &record.sections {
        for field in &section.fields {
            out.push(FormField {
                name: field_name(section.key, field.row, ValueColumn::Primary),
                label: field.label.clone(),
                value: field.value.clone(),
                section: section.key,
                column: ValueColumn::Primary,
                multiline: is_multiline(section.key, &field.label),
            });
            if let Some(vendor) = &field.vendor_value {
                out.push(FormField {
                    name: field_name(section.key, field.row, ValueColumn::Vendor),
                    label: field.label.clone(),
                    value: vendor.clone(),
                    section: section.key,
                    column: ValueColumn::Vendor,
                    multiline: false,
                });
            }
        }
    }
    out
}

/// Browsers submit textarea line breaks as CRLF; cells store LF.
fn normalize_newlines(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

/// Turn submitted `name -> value` pairs into edits, ordered by section table
/// order, then row, then column. Names that don't map to a cell are dropped.
pub fn parse_submission(submitted: &HashMap<String, String>) -> Vec<CellEdit> {
    let mut edits: Vec<CellEdit> = submitted
        .iter()
        .filter_map(|(name, value)| match parse_field_name(name) {
            Some((section, row, column)) => Some(CellEdit {
                section,
                row,
                column,
                value: normalize_newlines(value),
            }),
            None => {
                tracing::debug!(field = %name, "ignoring unknown form field");
                None
            }
        })
        .collect();
    let order = |key: SectionKey| {
        SECTIONS
            .iter()
            .position(|d| d.key == key)
            .unwrap_or(usize::MAX)
    };
    edits.sort_by(|a, b| {
        (order(a.section), a.row, a.column).cmp(&(
            order(b.section),
            b.row,
            b.column,
        ))
    });
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layout::extract_record, store::sample};

    #[test]
    fn test_field_names_round_trip_for_every_cell() {
        for desc in &SECTIONS {
            for row in desc.rows.clone() {
                let name = field_name(desc.key, row, ValueColumn::Primary);
                assert_eq!(
                    parse_field_name(&name),
                    Some((desc.key, row, ValueColumn::Primary))
                );
                if desc.vendor_col.is_some() {
                    let name = field_name(desc.key, row, ValueColumn::Vendor);
                    assert_eq!(
                        parse_field_name(&name),
                        Some((desc.key, row, ValueColumn::Vendor))
                    );
                }
            }
        }
    }

    #[test]
    fn test_parse_field_name_rejects() {
        assert_eq!(parse_field_name("Address"), None);
        assert_eq!(parse_field_name("income"), None);
        assert_eq!(parse_field_name("income.2"), None);
        assert_eq!(parse_field_name("income.30.vendor"), None);
        assert_eq!(parse_field_name("our_offer.23.other"), None);
        assert_eq!(parse_field_name("our_offer.23.vendor.x"), None);
        assert_eq!(parse_field_name("nowhere.3"), None);
        assert_eq!(parse_field_name("property_info.-1"), None);
    }

    #[test]
    fn test_form_fields_cover_record() {
        let record =
            extract_record("p", &sample::sample_sheet("Property Info"));
        let fields = form_fields(&record);

        let field_count: usize =
            record.sections.iter().map(|s| s.fields.len()).sum();
        let vendor_count = record
            .section(SectionKey::OurOffer)
            .map(|s| s.fields.len())
            .unwrap_or(0);
        assert_eq!(fields.len(), field_count + vendor_count);

        let link = fields
            .iter()
            .find(|f| f.label == "Google Maps Link")
            .unwrap();
        assert!(link.multiline);
        assert_eq!(link.name, "property_info.2");

        let vendor = fields.iter().find(|f| f.name == "our_offer.23.vendor");
        assert_eq!(vendor.map(|f| f.value.as_str()), Some("4200000"));
        assert!(fields
            .iter()
            .filter(|f| f.section == SectionKey::Questions)
            .all(|f| f.multiline));
    }

    #[test]
    fn test_parse_submission_orders_and_filters() {
        let submitted: HashMap<String, String> = [
            ("income.30", "310000"),
            ("our_offer.23.vendor", "4100000"),
            ("property_info.1", "9 Rue Saint-Paul"),
            ("our_offer.23", "3600000"),
            ("save", "Save Changes"),
            ("questions.29", "Roof?\r\nZoning?"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let edits = parse_submission(&submitted);
        let names: Vec<String> = edits
            .iter()
            .map(|e| field_name(e.section, e.row, e.column))
            .collect();

        assert_eq!(
            names,
            vec![
                "property_info.1",
                "our_offer.23",
                "our_offer.23.vendor",
                "income.30",
                "questions.29",
            ]
        );
        assert_eq!(edits[4].value, "Roof?\nZoning?");
    }

    #[test]
    fn test_untouched_multiline_cells_survive_resubmission() {
        let mut sheet = sample::sample_sheet("Property Info");
        sheet.set_text(29, layout::COL_F, "Roof age?\nZoning?");
        sheet.set_formula(2, layout::COL_B, "HYPERLINK(\"https://maps.google.com\")");
        let before = sheet.clone();
        let record = extract_record("p", &sheet);

        // what a browser posts back for an unedited form
        let submitted: HashMap<String, String> = form_fields(&record)
            .into_iter()
            .map(|f| (f.name, f.value.replace('\n', "\r\n")))
            .collect();
        let edits = parse_submission(&submitted);

        assert_eq!(layout::apply_edits(&mut sheet, &edits), 0);
        assert_eq!(sheet, before);
    }
}
