//! A sample property in the full section layout. Written to an empty
//! property directory on startup when seeding is enabled, and used as a
//! fixture by the tests.

use super::{workbook::Workbook, StoreError};
use crate::{
    layout::{COL_A, COL_B, COL_C, COL_E, COL_F},
    sheet::{Cell, CellValue, Sheet},
};
use std::{fs, path::Path};

pub const SAMPLE_ID: &str = "Sample_Property";

#[rustfmt::skip]
const LEFT: &[(u32, &str, &str)] = &[
    (0, "Property Information", ""),
    (1, "Address", "123 Main Street, Montreal, QC"),
    (2, "Google Maps Link", "https://maps.google.com/maps?q=123+Main+Street"),
    (3, "Lot Number", "1004031"),
    (4, "Borough", "montreal"),
    (5, "Year of construction", "1995"),
    (6, "Total Building SF", "25000"),
    (7, "Google Maps Building SF", "24800"),
    (8, "Floor Plate", "20000"),
    (9, "Land SF", "50000"),
    (10, "Ceiling Height", "24'"),
    (11, "Docks - google or vendor?", "4 (google)"),
    (12, "Column Distance", "40' x 40'"),
    (13, "Amps", "600"),
    (15, "Building Breakdown", ""),
    (16, "Total Building SF", "25000"),
    (17, "Warehouse Space", "20000"),
    (18, "Mezzanine Space", "1500"),
    (19, "Office Space SF", "3500"),
    (20, "% of Office", "14%"),
    (22, "Our Offer vs Vendor's Asking", "Our Offer"),
    (23, "Purchase Price", "3500000"),
    (24, "Price PSF of Building", "140"),
    (25, "Price PSF of Land", "70"),
    (26, "Net Rent PSF", "12"),
    (27, "Cap Rate", "0.065"),
    (29, "Income", ""),
    (30, "Gross Income / Year", "300000"),
    (31, "Gross income per Sq Ft", "12"),
    (32, "OPEX / Year", "75000"),
    (33, "OPEX per Sq Ft", "3"),
    (34, "Net Income / Year", "225000"),
    (35, "Net Income per Sq Ft", "9"),
    (36, "Occupancy %", "100%"),
];

#[rustfmt::skip]
const VENDOR: &[(u32, &str)] = &[
    (22, "Vendor's Asking"),
    (23, "4200000"),
    (24, "168"),
    (25, "84"),
    (26, "14"),
    (27, "0.055"),
];

#[rustfmt::skip]
const RIGHT: &[(u32, &str, &str)] = &[
    (0, "Owner Information", ""),
    (1, "Names of Owners", "Gestion Exemple Inc."),
    (2, "Other Properties", "2 buildings in Laval"),
    (3, "Contact Info", "514-555-0123"),
    (4, "Vendor Goes By", "Marc"),
    (6, "Title", ""),
    (7, "Previous Sale Price", "2100000 (2012)"),
    (8, "Active Mortgage", "Yes"),
    (9, "Registered Leases", "None"),
    (10, "Other Notes", ""),
    (12, "Important Info", ""),
    (13, "Sale Conditions", ""),
    (14, "Leaseback Terms", ""),
    (15, "Business for Sale", "No"),
    (16, "Owns surrounding lots", "No"),
    (17, "Type of Property", "See comment for instructions"),
    (28, "Questions", ""),
    (29, "Questions/Notes", ""),
];

fn put(sheet: &mut Sheet, row: u32, col: u16, text: &str) {
    if text.is_empty() {
        return;
    }
    sheet.set(row, col, Cell::literal(CellValue::from_input(text)));
}

pub fn sample_sheet(sheet_name: &str) -> Sheet {
    let mut sheet = Sheet::new(sheet_name);
    for &(row, label, value) in LEFT {
        sheet.set_text(row, COL_A, label);
        put(&mut sheet, row, COL_B, value);
    }
    for &(row, value) in VENDOR {
        put(&mut sheet, row, COL_C, value);
    }
    for &(row, label, value) in RIGHT {
        sheet.set_text(row, COL_E, label);
        put(&mut sheet, row, COL_F, value);
    }
    sheet
}

pub fn sample_workbook_bytes(sheet_name: &str) -> Result<Vec<u8>, StoreError> {
    Workbook::new(vec![sample_sheet(sheet_name)])
        .to_bytes()
        .map_err(|e| StoreError::write(SAMPLE_ID, e))
}

/// Write `Sample_Property.xlsx` into `dir` unless it already exists.
pub fn write_sample(dir: &Path, sheet_name: &str) -> Result<(), StoreError> {
    let path = dir.join(format!("{SAMPLE_ID}.xlsx"));
    if path.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| StoreError::write(SAMPLE_ID, e))?;
    let bytes = sample_workbook_bytes(sheet_name)?;
    fs::write(&path, bytes).map_err(|e| StoreError::write(SAMPLE_ID, e))?;
    tracing::info!(path = %path.display(), "created sample property");
    Ok(())
}
