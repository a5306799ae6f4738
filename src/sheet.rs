//! A backend-neutral grid of cells. Storage backends decode their files into
//! a `Sheet`, and the section layout only ever reads and writes through it.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::fmt::{self, Display};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows and columns are zero-based, matching both calamine and
/// rust_xlsxwriter.
pub type Row = u32;
pub type Col = u16;

#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Shown as `YYYY-MM-DD`, with the time only when it isn't midnight.
    DateTime(NaiveDateTime),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::DateTime(dt) if dt.time() == NaiveTime::MIN => {
                write!(f, "{}", dt.format(DATE_FORMAT))
            }
            CellValue::DateTime(dt) => {
                write!(f, "{}", dt.format(DATETIME_FORMAT))
            }
        }
    }
}

impl CellValue {
    /// Interpret a form input. Canonical decimal numbers become numbers so
    /// that the spreadsheet can still do arithmetic on them, and ISO dates
    /// become dates; anything whose display form would differ from what the
    /// user typed stays text.
    pub fn from_input(input: &str) -> Self {
        if input.is_empty() {
            return CellValue::Empty;
        }
        let parsed = match input.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(CellValue::Number(n)),
            _ => NaiveDate::parse_from_str(input, DATE_FORMAT)
                .map(|d| d.and_time(NaiveTime::MIN))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(input, DATETIME_FORMAT)
                })
                .ok()
                .map(CellValue::DateTime),
        };
        match parsed {
            Some(value) if value.to_string() == input => value,
            _ => CellValue::Text(input.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Formula text without the leading `=`; `value` is its cached result.
    pub formula: Option<String>,
}

impl Cell {
    pub fn literal(value: CellValue) -> Self {
        Self {
            value,
            formula: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(Row, Col), Cell>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, row: Row, col: Col) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Display text of a cell; empty string for a missing cell.
    pub fn text(&self, row: Row, col: Col) -> String {
        self.get(row, col)
            .map(|c| c.value.to_string())
            .unwrap_or_default()
    }

    pub fn set(&mut self, row: Row, col: Col, cell: Cell) {
        if cell.value == CellValue::Empty && cell.formula.is_none() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), cell);
        }
    }

    pub fn set_text(&mut self, row: Row, col: Col, text: &str) {
        self.set(row, col, Cell::literal(CellValue::Text(text.to_string())));
    }

    pub fn set_formula(&mut self, row: Row, col: Col, formula: &str) {
        let formula = formula.trim_start_matches('=').to_string();
        let entry = self
            .cells
            .entry((row, col))
            .or_insert_with(|| Cell::literal(CellValue::Empty));
        entry.formula = Some(formula);
    }

    /// Write a value typed into the form. Returns whether the cell changed.
    ///
    /// Input identical to the current display text leaves the cell alone,
    /// so a formula whose result the user did not touch survives a save.
    pub fn write_input(&mut self, row: Row, col: Col, input: &str) -> bool {
        if self.text(row, col) == input {
            return false;
        }
        self.set(row, col, Cell::literal(CellValue::from_input(input)));
        true
    }

    pub fn cells(&self) -> impl Iterator<Item = (&(Row, Col), &Cell)> {
        self.cells.iter()
    }
}

/// `(0, 1)` -> `"B1"`, for log lines and error messages.
pub fn cell_ref(row: Row, col: Col) -> String {
    let mut letters = String::new();
    let mut n = u32::from(col) + 1;
    while n > 0 {
        n -= 1;
        letters.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    format!("{letters}{}", row + 1)
}
