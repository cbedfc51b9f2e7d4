//! Output packaging: ZIP archive, index workbook and the best-effort PDF
//! pipeline (conversion, watermark, signature, consolidation).

pub mod archive;
pub mod index;
pub mod pdf;

pub use archive::make_zip;
pub use index::build_index_sheet;
pub use pdf::{
    add_text_watermark, export_pdfs, merge_pdfs, CommandSigner, PdfConverter, PdfExportOptions,
    PdfSigner, SofficeConverter,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("error al escribir el ZIP: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("error de E/S: {0}")]
    Io(#[from] std::io::Error),
    #[error("error al escribir el libro de índice: {0}")]
    Spreadsheet(String),
    #[error("PDF inválido: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("PDF sin catálogo o árbol de páginas")]
    PdfStructure,
    #[error("no se pudo ejecutar '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{tool}' terminó con estado {status}")]
    ToolExit { tool: String, status: String },
    #[error("'{0}' no produjo el archivo esperado")]
    MissingOutput(String),
    #[error("comando inválido: {0}")]
    InvalidCommand(String),
}
