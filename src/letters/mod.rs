//! Letter generation.
//!
//! One DOCX per group of rows: the routed template gets its records table
//! refilled, its placeholders substituted and, optionally, a page-numbered
//! footer.

pub mod common;
pub mod generator;
pub mod placeholders;
pub mod table;

pub use generator::{generate_letters_per_group, GeneratedLetter, GenerationOptions, GenerationReport};

use thiserror::Error;

use crate::docx::DocxError;

/// Failure of a single group; other groups are unaffected.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Docx(#[from] DocxError),
    #[error("No se encontró una tabla válida (4 columnas) en la plantilla.")]
    NoTargetTable,
}
