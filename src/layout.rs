//! The fixed cell layout of a property sheet.
//!
//! Each section is a rectangular range: a label column, a value column, and
//! (for the offer section only) a vendor column, over an inclusive row span.
//! Extraction walks [`SECTIONS`] and evaluates every descriptor on its own.
//! Ranges sharing a label column never overlap, so no row can belong to two
//! sections.

use super::{
    models::{CellEdit, Field, PropertyRecord, Section, SectionKey, ValueColumn},
    sheet::{cell_ref, Col, Row, Sheet},
};
use std::ops::RangeInclusive;

pub const COL_A: Col = 0;
pub const COL_B: Col = 1;
pub const COL_C: Col = 2;
pub const COL_E: Col = 4;
pub const COL_F: Col = 5;

#[derive(Debug)]
pub struct SectionDescriptor {
    pub key: SectionKey,
    pub title: &'static str,
    pub rows: RangeInclusive<Row>,
    pub label_col: Col,
    pub value_col: Col,
    pub vendor_col: Option<Col>,
    /// Labels that mark the section heading rather than a field.
    pub headings: &'static [&'static str],
}

impl SectionDescriptor {
    pub fn column(&self, column: ValueColumn) -> Option<Col> {
        match column {
            ValueColumn::Primary => Some(self.value_col),
            ValueColumn::Vendor => self.vendor_col,
        }
    }

    /// The field label at `row`, if that row holds a field of this section.
    pub fn label_at(&self, sheet: &Sheet, row: Row) -> Option<String> {
        if !self.rows.contains(&row) {
            return None;
        }
        let label = sheet.text(row, self.label_col).trim().to_string();
        if label.is_empty() || self.headings.contains(&label.as_str()) {
            None
        } else {
            Some(label)
        }
    }

    pub fn extract(&self, sheet: &Sheet) -> Section {
        let fields = self
            .rows
            .clone()
            .filter_map(|row| {
                self.label_at(sheet, row).map(|label| Field {
                    row,
                    label,
                    value: sheet.text(row, self.value_col),
                    vendor_value: self.vendor_col.map(|c| sheet.text(row, c)),
                })
            })
            .collect();
        Section {
            key: self.key,
            title: self.title,
            fields,
        }
    }
}

#[rustfmt::skip]
pub static SECTIONS: [SectionDescriptor; 8] = [
    SectionDescriptor {
        key: SectionKey::PropertyInfo,
        title: "Property Information",
        rows: 1..=14,
        label_col: COL_A, value_col: COL_B, vendor_col: None,
        headings: &["Property Information"],
    },
    SectionDescriptor {
        key: SectionKey::OwnerInfo,
        title: "Owner Information",
        rows: 1..=5,
        label_col: COL_E, value_col: COL_F, vendor_col: None,
        headings: &["Owner Information"],
    },
    SectionDescriptor {
        key: SectionKey::TitleInfo,
        title: "Title Information",
        rows: 7..=11,
        label_col: COL_E, value_col: COL_F, vendor_col: None,
        headings: &["Title", "Title Information"],
    },
    SectionDescriptor {
        key: SectionKey::ImportantInfo,
        title: "Important Info",
        rows: 13..=18,
        label_col: COL_E, value_col: COL_F, vendor_col: None,
        headings: &["Important Info"],
    },
    SectionDescriptor {
        key: SectionKey::BuildingBreakdown,
        title: "Building Breakdown",
        rows: 16..=21,
        label_col: COL_A, value_col: COL_B, vendor_col: None,
        headings: &["Building Breakdown"],
    },
    SectionDescriptor {
        key: SectionKey::OurOffer,
        title: "Our Offer vs Vendor's Asking",
        rows: 23..=28,
        label_col: COL_A, value_col: COL_B, vendor_col: Some(COL_C),
        headings: &["Our Offer", "Our Offer vs Vendor's Asking", "Field"],
    },
    SectionDescriptor {
        key: SectionKey::Income,
        title: "Income",
        rows: 30..=37,
        label_col: COL_A, value_col: COL_B, vendor_col: None,
        headings: &["Income"],
    },
    SectionDescriptor {
        key: SectionKey::Questions,
        title: "Questions",
        rows: 29..=59,
        label_col: COL_E, value_col: COL_F, vendor_col: None,
        headings: &["Questions"],
    },
];

pub fn descriptor(key: SectionKey) -> &'static SectionDescriptor {
    SECTIONS
        .iter()
        .find(|d| d.key == key)
        .expect("every section key has a descriptor")
}

/// Read every section out of the sheet. Each descriptor is evaluated
/// unconditionally; a section that matched never prevents a later one from
/// being read.
pub fn extract_record(id: &str, sheet: &Sheet) -> PropertyRecord {
    PropertyRecord {
        id: id.to_string(),
        sections: SECTIONS.iter().map(|d| d.extract(sheet)).collect(),
    }
}

/// Write edits into their fixed cells. Edits aimed at rows that carry no
/// field label, or at a vendor column the section doesn't have, are skipped.
/// Returns the number of cells that changed.
pub fn apply_edits(sheet: &mut Sheet, edits: &[CellEdit]) -> usize {
    let mut changed = 0;
    for edit in edits {
        let desc = descriptor(edit.section);
        let Some(col) = desc.column(edit.column) else {
            tracing::warn!(section = %edit.section, "no vendor column; edit skipped");
            continue;
        };
        if desc.label_at(sheet, edit.row).is_none() {
            tracing::debug!(
                section = %edit.section,
                cell = %cell_ref(edit.row, col),
                "edit targets a row without a label; skipped"
            );
            continue;
        }
        if sheet.write_input(edit.row, col, &edit.value) {
            changed += 1;
        }
    }
    changed
}
