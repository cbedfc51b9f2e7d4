//! Tabular source reading (first worksheet of a workbook).

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use super::DataError;

/// A typed cell value as delivered by the workbook reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Display text; blank text counts as missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(f) => Some(if (f.floor() - f).abs() < f64::EPSILON {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.as_text().is_none()
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Converts a calamine `Data` into a [`Cell`]; dates become Excel serials.
pub fn data_to_cell(d: &Data) -> Cell {
    match d {
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Empty | Data::Error(_) => Cell::Empty,
    }
}

/// Header row plus data rows of one worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Reads the first worksheet of an xlsx/xls/xlsb/ods file. The first row is
/// the header row; fully empty rows are skipped.
pub fn read_first_sheet<P: AsRef<Path>>(path: P) -> Result<Sheet, DataError> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| DataError::Workbook {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names().to_owned();
    let first = sheet_names.first().ok_or_else(|| DataError::Workbook {
        path: path.display().to_string(),
        message: "no se encontraron hojas en el archivo Excel".to_string(),
    })?;
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| DataError::Workbook {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|c| data_to_cell(c).as_text().unwrap_or_default())
            .collect(),
        None => return Ok(Sheet::default()),
    };

    let body: Vec<Vec<Cell>> = rows
        .map(|r| r.iter().map(data_to_cell).collect::<Vec<_>>())
        .filter(|r| r.iter().any(|c| !c.is_missing()))
        .collect();

    log::info!(
        "Hoja '{}' leída: {} columnas, {} filas",
        first,
        headers.len(),
        body.len()
    );
    Ok(Sheet::new(headers, body))
}
