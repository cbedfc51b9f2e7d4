//! The 4-column records table (mesa, nivel, fecha, dato) of a letter.

use crate::docx::document::{cell_text, column_count, grid_widths, paragraph_with_text};
use crate::docx::xml::{Element, Node};
use crate::docx::Document;
use crate::text::normalize;

/// Normalised header texts that identify the records table.
pub const EXPECTED_HEADERS: [&str; 4] = ["nombre de la mesa", "nivel", "fecha", "dato transformador"];

pub const TABLE_COLUMNS: usize = 4;

/// Every expected header equals, or is contained in, one of the cells of
/// the first row (in any order).
pub fn header_matches(table: &Element) -> bool {
    let Some(header) = table.child("w:tr") else {
        return false;
    };
    let cells: Vec<String> = header
        .children_named("w:tc")
        .map(|c| normalize(&cell_text(c)))
        .collect();
    EXPECTED_HEADERS
        .iter()
        .all(|expected| cells.iter().any(|h| h == expected || h.contains(expected)))
}

/// Index of the body table to fill: the preferred index when it exists and
/// has 4 columns, else the first table with the expected headers, else the
/// first 4-column table.
pub fn find_target_table(doc: &Document, prefer_index: Option<i64>) -> Option<usize> {
    let tables = doc.tables();
    let preferred = prefer_index
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| tables.get(*i).is_some_and(|t| column_count(t) == TABLE_COLUMNS));
    if preferred.is_some() {
        return preferred;
    }
    if let Some(i) = prefer_index {
        log::debug!("índice de tabla {} no válido; se busca por encabezados", i);
    }
    tables
        .iter()
        .position(|t| header_matches(t))
        .or_else(|| tables.iter().position(|t| column_count(t) == TABLE_COLUMNS))
}

/// Removes every row but the first, starting from the last one.
pub fn clear_table_keep_header(table: &mut Element) {
    while table.children_named("w:tr").count() > 1 {
        let last = table
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(e) if e.is("w:tr")));
        match last {
            Some(index) => {
                table.children.remove(index);
            }
            None => break,
        }
    }
}

fn new_row(widths: &[Option<String>], columns: usize, values: &[String]) -> Element {
    let mut row = Element::new("w:tr");
    for i in 0..columns {
        let mut cell = Element::new("w:tc");
        if let Some(Some(width)) = widths.get(i) {
            cell = cell.with_child(
                Element::new("w:tcPr").with_child(
                    Element::new("w:tcW")
                        .with_attr("w:w", width.as_str())
                        .with_attr("w:type", "dxa"),
                ),
            );
        }
        let value = values.get(i).map(String::as_str).unwrap_or_default();
        row.children.push(Node::Element(cell.with_child(paragraph_with_text(value))));
    }
    row
}

/// Appends one row per record. Values beyond the fourth are ignored.
pub fn fill_table(table: &mut Element, rows: &[Vec<String>]) {
    let widths = grid_widths(table);
    let columns = column_count(table);
    for values in rows {
        let values = &values[..values.len().min(TABLE_COLUMNS)];
        table.children.push(Node::Element(new_row(&widths, columns, values)));
    }
}
