//! `.xlsx` codec: calamine decodes every sheet into [`Sheet`]s and
//! rust_xlsxwriter encodes them back. All sheets, values and formulas are
//! carried through a read-modify-write, not just the property sheet.

use crate::sheet::{Cell, CellValue, Col, Row, Sheet};
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveTime;
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("{0}")]
    Read(#[from] calamine::XlsxError),
    #[error("{0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
    #[error("cell at row {row}, column {col} is outside the sheet")]
    OutOfRange { row: usize, col: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

fn position(
    start: (u32, u32),
    row: usize,
    col: usize,
) -> Result<(Row, Col), WorkbookError> {
    let abs_row = start.0 as usize + row;
    let abs_col = start.1 as usize + col;
    match (Row::try_from(abs_row), Col::try_from(abs_col)) {
        (Ok(r), Ok(c)) => Ok((r, c)),
        _ => Err(WorkbookError::OutOfRange {
            row: abs_row,
            col: abs_col,
        }),
    }
}

fn to_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if !dt.is_duration() => CellValue::DateTime(ndt),
            _ => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => {
            CellValue::Text(s.clone())
        }
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkbookError> {
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let mut sheets = Vec::new();
        for name in xlsx.sheet_names() {
            let mut sheet = Sheet::new(&name);

            let values = xlsx.worksheet_range(&name)?;
            if let Some(start) = values.start() {
                for (r, c, data) in values.used_cells() {
                    let (row, col) = position(start, r, c)?;
                    sheet.set(row, col, Cell::literal(to_value(data)));
                }
            }

            let formulas = xlsx.worksheet_formula(&name)?;
            if let Some(start) = formulas.start() {
                for (r, c, formula) in formulas.used_cells() {
                    if formula.is_empty() {
                        continue;
                    }
                    let (row, col) = position(start, r, c)?;
                    sheet.set_formula(row, col, formula);
                }
            }

            sheets.push(sheet);
        }
        Ok(Self { sheets })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WorkbookError> {
        let mut out = XlsxWorkbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let datetime_format =
            Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        for sheet in &self.sheets {
            let ws = out.add_worksheet();
            ws.set_name(&sheet.name)?;
            for (&(row, col), cell) in sheet.cells() {
                if let Some(formula) = &cell.formula {
                    let formula = Formula::new(format!("={formula}"))
                        .set_result(cell.value.to_string());
                    ws.write_formula(row, col, formula)?;
                    continue;
                }
                match &cell.value {
                    CellValue::Empty => {}
                    CellValue::Text(s) => {
                        ws.write_string(row, col, s)?;
                    }
                    CellValue::Number(n) => {
                        ws.write_number(row, col, *n)?;
                    }
                    CellValue::Bool(b) => {
                        ws.write_boolean(row, col, *b)?;
                    }
                    CellValue::DateTime(dt) => {
                        let format = if dt.time() == NaiveTime::MIN {
                            &date_format
                        } else {
                            &datetime_format
                        };
                        ws.write_datetime_with_format(row, col, dt, format)?;
                    }
                }
            }
        }
        Ok(out.save_to_buffer()?)
    }

    /// Index of the sheet called `preferred`, or of the first sheet when the
    /// workbook has no sheet by that name.
    pub fn sheet_index(&self, preferred: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name == preferred)
            .or(if self.sheets.is_empty() { None } else { Some(0) })
    }
}
