//! File kinds, MIME detection and loading of named input files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::NamedBlobs;

/// File kinds picked up when loading templates and image assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileExtension {
    Docx,
    Png,
    Jpeg,
    Jpg,
    Gif,
    Bmp,
    Unknown,
}

impl FileExtension {
    /// MIME type for this extension.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Png => "image/png",
            Self::Jpeg | Self::Jpg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Unknown => "application/octet-stream",
        }
    }

    pub fn from_ext(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "docx" => Self::Docx,
            "png" => Self::Png,
            "jpeg" => Self::Jpeg,
            "jpg" => Self::Jpg,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            _ => Self::Unknown,
        }
    }

    pub fn from_filename(filename: &str) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_ext)
            .unwrap_or(Self::Unknown)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::Jpg | Self::Gif | Self::Bmp)
    }
}

/// MIME type from the file name, falling back to the `mime_guess` table for
/// kinds the generator does not handle itself.
pub fn detect_mime_type(filename: &str) -> &'static str {
    match FileExtension::from_filename(filename) {
        FileExtension::Unknown => mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or("application/octet-stream"),
        known => known.mime_type(),
    }
}

/// MIME type from the file's magic bytes.
pub fn detect_mime_from_bytes(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    if data.starts_with(b"%PDF") {
        return Some("application/pdf");
    }

    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    if data.starts_with(b"GIF8") {
        return Some("image/gif");
    }

    // DOCX and XLSX are both ZIP containers.
    if data.starts_with(b"PK\x03\x04") {
        return Some("application/zip");
    }

    None
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

/// Reads every file of an accepted kind, keyed by bare file name.
///
/// Each path may be a file or a directory (not recursive). Directory entries
/// are read in name order; a later file with the same name replaces the
/// earlier one. Explicitly named files are read regardless of extension.
pub fn load_named_files(
    paths: &[PathBuf],
    accept: impl Fn(FileExtension) -> bool,
) -> io::Result<NamedBlobs> {
    let mut out = NamedBlobs::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            for entry in entries {
                let Some(name) = file_name_of(&entry) else {
                    continue;
                };
                // Office lock files ("~$carta.docx").
                if name.starts_with("~$") || !accept(FileExtension::from_filename(&name)) {
                    continue;
                }
                out.insert(name, fs::read(&entry)?);
            }
        } else {
            let name = file_name_of(path).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("ruta inválida: {}", path.display()))
            })?;
            out.insert(name, fs::read(path)?);
        }
    }
    log::debug!("{} archivo(s) cargado(s)", out.len());
    Ok(out)
}
