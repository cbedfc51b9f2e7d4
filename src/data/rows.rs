//! Prepared rows: mapped field values plus the parsed letter date.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::mapping::{ColumnMapping, Field};
use super::sheet::{Cell, Sheet};
use super::validation::validate_mapping;
use super::DataError;

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y",
];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

/// One source record. Missing or blank values are absent from the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    values: BTreeMap<Field, String>,
    pub fecha_ts: Option<NaiveDateTime>,
    pub fecha_fmt: String,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field from a cell. `Field::Fecha` also parses the date.
    pub fn with_cell(mut self, field: Field, cell: &Cell) -> Self {
        if field == Field::Fecha {
            self.fecha_ts = parse_date(cell);
            self.fecha_fmt = format_date_dmy(self.fecha_ts);
        }
        match cell.as_text() {
            Some(text) => {
                self.values.insert(field, text);
            }
            None => {
                self.values.remove(&field);
            }
        }
        self
    }

    pub fn with(self, field: Field, value: &str) -> Self {
        self.with_cell(field, &Cell::from(value))
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Value as written in a table cell; missing renders empty. The date
    /// column uses the display format.
    pub fn cell_value(&self, field: Field) -> String {
        match field {
            Field::Fecha => self.fecha_fmt.clone(),
            other => self.get(other).unwrap_or_default().to_string(),
        }
    }
}

/// Excel serials count days from 1899-12-30; the fractional part is dropped.
fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = Duration::try_days(serial.trunc() as i64)?;
    epoch
        .checked_add_signed(days)
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parses a date cell. Numbers are Excel serials; text is tried against the
/// known day/month layouts, then date-time layouts.
pub fn parse_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Number(serial) => from_excel_serial(*serial),
        Cell::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                })
        }
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// `dd/mm/YYYY`, or empty when the date is unknown.
pub fn format_date_dmy(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// Validates the mapping against the sheet headers and converts every data
/// row. Fails before producing any row when a required role is missing.
pub fn prepare_rows(sheet: &Sheet, mapping: &ColumnMapping) -> Result<Vec<Row>, DataError> {
    validate_mapping(mapping, &sheet.headers)?;

    let columns: Vec<(Field, usize)> = mapping
        .iter()
        .filter_map(|(field, column)| sheet.column_index(column).map(|idx| (field, idx)))
        .collect();

    let rows: Vec<Row> = sheet
        .rows
        .iter()
        .map(|cells| {
            columns.iter().fold(Row::new(), |row, (field, idx)| {
                row.with_cell(*field, cells.get(*idx).unwrap_or(&Cell::Empty))
            })
        })
        .collect();

    let undated = rows.iter().filter(|r| r.fecha_ts.is_none()).count();
    if undated > 0 {
        log::warn!("{} de {} filas tienen una fecha no reconocida", undated, rows.len());
    }
    Ok(rows)
}

/// Keeps the rows whose ACTOR is one of `actors`; an empty list keeps all.
pub fn filter_actors(rows: Vec<Row>, actors: &[String]) -> Vec<Row> {
    if actors.is_empty() {
        return rows;
    }
    let wanted: HashSet<&str> = actors.iter().map(|a| a.trim()).collect();
    rows.into_iter()
        .filter(|r| r.get(Field::Actor).is_some_and(|a| wanted.contains(a)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).map(|d| d.and_time(NaiveTime::MIN))
    }

    #[test]
    fn test_parse_excel_serial() {
        assert_eq!(parse_date(&Cell::Number(45306.0)), ymd(2024, 1, 15));
        assert_eq!(parse_date(&Cell::Number(45306.75)), ymd(2024, 1, 15));
    }

    #[test]
    fn test_parse_text_layouts() {
        assert_eq!(parse_date(&Cell::from("2024-03-05")), ymd(2024, 3, 5));
        assert_eq!(parse_date(&Cell::from("05/03/2024")), ymd(2024, 3, 5));
        assert_eq!(parse_date(&Cell::from("05-03-2024")), ymd(2024, 3, 5));
        assert_eq!(parse_date(&Cell::from("2024/03/05")), ymd(2024, 3, 5));
        assert_eq!(parse_date(&Cell::from("12/25/2024")), ymd(2024, 12, 25));
        assert_eq!(parse_date(&Cell::from("05.03.2024")), ymd(2024, 3, 5));
        assert_eq!(
            parse_date(&Cell::from("2024-03-05 10:30:00")).map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn test_unparsable_dates() {
        assert_eq!(parse_date(&Cell::from("pendiente")), None);
        assert_eq!(parse_date(&Cell::Empty), None);
        assert_eq!(format_date_dmy(None), "");
        assert_eq!(format_date_dmy(ymd(2024, 3, 5)), "05/03/2024");
    }

    #[test]
    fn test_prepare_rows_maps_fields() {
        let headers: Vec<String> = ["Actor", "Directivo", "Prefijo", "Mesa", "Nivel", "Fecha", "Dato"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let sheet = Sheet::new(
            headers.clone(),
            vec![vec![
                Cell::from("Hacienda"),
                Cell::from("Ana Gómez"),
                Cell::from("Dra."),
                Cell::from("Mesa fiscal"),
                Cell::from("Alto"),
                Cell::Number(45306.0),
                Cell::Empty,
            ]],
        );
        let mapping = super::super::guess_mapping(&headers);
        let rows = prepare_rows(&sheet, &mapping).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(Field::Actor), Some("Hacienda"));
        assert_eq!(rows[0].get(Field::Dato), None);
        assert_eq!(rows[0].cell_value(Field::Dato), "");
        assert_eq!(rows[0].cell_value(Field::Fecha), "15/01/2024");
    }

    #[test]
    fn test_prepare_rows_fails_fast() {
        let sheet = Sheet::new(vec!["Actor".to_string()], vec![vec![Cell::from("x")]]);
        let mapping = ColumnMapping::new().with(Field::Actor, "Actor");
        assert!(matches!(
            prepare_rows(&sheet, &mapping),
            Err(DataError::Validation(_))
        ));
    }

    #[test]
    fn test_filter_actors() {
        let rows = vec![
            Row::new().with(Field::Actor, "A"),
            Row::new().with(Field::Actor, "B"),
            Row::new(),
        ];
        assert_eq!(filter_actors(rows.clone(), &[]).len(), 3);
        let kept = filter_actors(rows, &["B".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get(Field::Actor), Some("B"));
    }
}
