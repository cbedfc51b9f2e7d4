//! Minimal DOCX (WordprocessingML) document model.
//!
//! Only the pieces the letter pipeline touches are modelled:
//! - `xml`: owned element tree with parse/serialise
//! - `package`: ZIP parts, relationships, content types
//! - `document`: body paragraphs, tables, runs
//! - `image`: inline pictures
//! - `footer`: page-numbered footer
//! - `merge`: concatenation of several documents into one

pub mod document;
pub mod footer;
pub mod image;
pub mod merge;
pub mod package;
pub mod xml;

pub use document::Document;
pub use image::InlineImage;
pub use merge::merge_documents_docx;

use thiserror::Error;

/// Errors raised while reading or writing a DOCX package.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("la plantilla no es un paquete DOCX válido: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("error de E/S en el paquete DOCX: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] xml::XmlError),
    #[error("falta la parte '{0}' en el paquete DOCX")]
    MissingPart(String),
    #[error("el documento no tiene elemento w:body")]
    MissingBody,
    #[error("imagen no soportada: {0}")]
    Image(String),
}

/// Namespace prefixes used when building new WordprocessingML fragments.
pub(crate) mod ns {
    pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
    pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    pub const PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
}
