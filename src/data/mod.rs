//! Tabular input: workbook reading, column roles, prepared rows and the
//! data-quality report.

pub mod mapping;
pub mod quality;
pub mod rows;
pub mod sheet;
pub mod validation;

pub use mapping::{guess_mapping, ColumnMapping, Field};
pub use quality::QualityReport;
pub use rows::{filter_actors, format_date_dmy, parse_date, prepare_rows, Row};
pub use sheet::{read_first_sheet, Cell, Sheet};
pub use validation::{ValidationError, ValidationErrors};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no se pudo leer el libro '{path}': {message}")]
    Workbook { path: String, message: String },
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}
