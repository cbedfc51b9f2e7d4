//! Index workbook: `Resumen` (Grupo, Registros) and, when any group failed,
//! `Errores` (Grupo, Error).

use std::collections::BTreeMap;
use std::io::Cursor;

use super::ExportError;

pub const SUMMARY_SHEET: &str = "Resumen";
pub const ERRORS_SHEET: &str = "Errores";

fn sheet_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Spreadsheet(e.to_string())
}

/// `summary` is (group, record count), already sorted by group.
pub fn build_index_sheet(
    summary: &[(String, usize)],
    errors: &BTreeMap<String, String>,
) -> Result<Vec<u8>, ExportError> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();

    let sheet = book.new_sheet(SUMMARY_SHEET).map_err(sheet_error)?;
    sheet.get_cell_mut((1, 1)).set_value("Grupo");
    sheet.get_cell_mut((2, 1)).set_value("Registros");
    for (i, (group, records)) in summary.iter().enumerate() {
        let row = i as u32 + 2;
        sheet.get_cell_mut((1, row)).set_value(group.as_str());
        sheet.get_cell_mut((2, row)).set_value_number(*records as f64);
    }

    if !errors.is_empty() {
        let sheet = book.new_sheet(ERRORS_SHEET).map_err(sheet_error)?;
        sheet.get_cell_mut((1, 1)).set_value("Grupo");
        sheet.get_cell_mut((2, 1)).set_value("Error");
        for (i, (group, message)) in errors.iter().enumerate() {
            let row = i as u32 + 2;
            sheet.get_cell_mut((1, row)).set_value(group.as_str());
            sheet.get_cell_mut((2, row)).set_value(message.as_str());
        }
    }

    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).map_err(sheet_error)?;
    Ok(out.into_inner())
}
