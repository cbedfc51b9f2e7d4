//! PDF export.
//!
//! Conversion and signing are delegated to external tools behind the
//! [`PdfConverter`] and [`PdfSigner`] traits. Watermarking and merging are
//! done in-process with `lopdf`. Every step is best effort: a failure drops
//! (or leaves unstamped/unsigned) that PDF and never affects the DOCX
//! outputs.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

use super::ExportError;
use crate::files::detect_mime_from_bytes;
use crate::letters::GenerationReport;
use crate::NamedBlobs;

const WATERMARK_FONT_SIZE: f32 = 36.0;
const WATERMARK_XOBJECT_PREFIX: &str = "CartasWm";
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// DOCX -> PDF conversion.
pub trait PdfConverter {
    fn convert(&self, docx: &[u8], file_name: &str) -> Result<Vec<u8>, ExportError>;
}

/// Digital signature of a finished PDF.
pub trait PdfSigner {
    fn sign(&self, pdf: &[u8]) -> Result<Vec<u8>, ExportError>;
}

/// Converts with LibreOffice in headless mode inside a temporary directory.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    pub binary: String,
}

impl SofficeConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl PdfConverter for SofficeConverter {
    fn convert(&self, docx: &[u8], file_name: &str) -> Result<Vec<u8>, ExportError> {
        let temp_dir = tempdir()?;
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("carta");
        let input = temp_dir.path().join(format!("{stem}.docx"));
        fs::write(&input, docx)?;

        let status = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(temp_dir.path())
            .arg(&input)
            .current_dir(temp_dir.path())
            .status()
            .map_err(|source| ExportError::Spawn {
                tool: self.binary.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ExportError::ToolExit {
                tool: self.binary.clone(),
                status: status.to_string(),
            });
        }

        let output = temp_dir.path().join(format!("{stem}.pdf"));
        let pdf = fs::read(&output).map_err(|_| ExportError::MissingOutput(self.binary.clone()))?;
        if detect_mime_from_bytes(&pdf) != Some("application/pdf") {
            return Err(ExportError::MissingOutput(self.binary.clone()));
        }
        Ok(pdf)
    }
}

/// Runs an external signing command. The command line is split on
/// whitespace; `{input}` and `{output}` are replaced by temporary file paths.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    pub command: String,
}

impl CommandSigner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PdfSigner for CommandSigner {
    fn sign(&self, pdf: &[u8]) -> Result<Vec<u8>, ExportError> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ExportError::InvalidCommand(self.command.clone()))?;
        if !self.command.contains("{output}") {
            return Err(ExportError::InvalidCommand(format!(
                "'{}' no incluye {{output}}",
                self.command
            )));
        }

        let temp_dir = tempdir()?;
        let input = temp_dir.path().join("entrada.pdf");
        let output = temp_dir.path().join("firmado.pdf");
        fs::write(&input, pdf)?;

        let args: Vec<String> = parts
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
            })
            .collect();
        let status = Command::new(program)
            .args(&args)
            .current_dir(temp_dir.path())
            .status()
            .map_err(|source| ExportError::Spawn {
                tool: program.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(ExportError::ToolExit {
                tool: program.to_string(),
                status: status.to_string(),
            });
        }
        fs::read(&output).map_err(|_| ExportError::MissingOutput(program.to_string()))
    }
}

/// Literal string bytes for a content stream: WinAnsi (Latin-1 subset),
/// unmappable characters become `?`.
fn pdf_literal(text: &str) -> Vec<u8> {
    let mut out = vec![b'('];
    for ch in text.chars() {
        let byte = u32::from(ch)
            .try_into()
            .ok()
            .filter(|b: &u8| *b >= 0x20)
            .unwrap_or(b'?');
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

fn inherited_media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(media_box) = dict.get(b"MediaBox") {
            let (_, media_box) = doc.dereference(media_box).ok()?;
            let values: Vec<f32> = media_box
                .as_array()
                .ok()?
                .iter()
                .filter_map(|v| v.as_float().ok())
                .collect();
            if let [x0, y0, x1, y1] = values[..] {
                return Some(((x1 - x0).abs(), (y1 - y0).abs()));
            }
            return None;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Copies inherited page resources onto the page itself, so adding an
/// entry does not hide the ones declared on an ancestor `Pages` node.
fn materialize_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), ExportError> {
    if doc.get_dictionary(page_id)?.has(b"Resources") {
        return Ok(());
    }
    let mut inherited = None;
    let mut parent = doc.get_dictionary(page_id)?.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(id) = parent {
        let dict = doc.get_dictionary(id)?;
        if let Ok(resources) = dict.get(b"Resources") {
            let (_, resources) = doc.dereference(resources)?;
            inherited = resources.as_dict().ok().cloned();
            break;
        }
        parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    if let Some(resources) = inherited {
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

/// Stamps `text` diagonally (45°, Helvetica 36pt, light grey) on every page.
pub fn add_text_watermark(pdf: &[u8], text: &str) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::load_mem(pdf)?;
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let angle = std::f32::consts::FRAC_PI_4;
    let (cos, sin) = (angle.cos(), angle.sin());
    let half_width = text.chars().count() as f32 * WATERMARK_FONT_SIZE * 0.25;

    for page_id in doc.get_pages().into_values().collect::<Vec<_>>() {
        let (width, height) = inherited_media_box(&doc, page_id).unwrap_or(DEFAULT_PAGE_SIZE);
        let x = width / 2.0 - cos * half_width;
        let y = height / 2.0 - sin * half_width;

        let mut stamp = format!(
            "q 0.75 g BT /F1 {size} Tf {cos:.4} {sin:.4} {nsin:.4} {cos:.4} {x:.2} {y:.2} Tm ",
            size = WATERMARK_FONT_SIZE,
            nsin = -sin,
        )
        .into_bytes();
        stamp.extend(pdf_literal(text));
        stamp.extend_from_slice(b" Tj ET Q");

        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            },
            stamp,
        );
        let xobject_id = doc.add_object(xobject);
        let name = format!("{WATERMARK_XOBJECT_PREFIX}{}", page_id.0);
        materialize_resources(&mut doc, page_id)?;
        doc.add_xobject(page_id, name.as_str(), xobject_id)?;

        let mut content = b"q\n".to_vec();
        content.extend(doc.get_page_content(page_id)?);
        content.extend_from_slice(format!("\nQ\nq /{name} Do Q\n").as_bytes());
        doc.change_page_content(page_id, content)?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

/// Concatenates every page of every PDF, in order, into one document.
/// `None` when there is nothing to merge.
pub fn merge_pdfs(pdfs: &[Vec<u8>]) -> Result<Option<Vec<u8>>, ExportError> {
    if pdfs.is_empty() {
        return Ok(None);
    }

    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects = std::collections::BTreeMap::new();
    for bytes in pdfs {
        let mut doc = Document::load_mem(bytes)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;
        for page_id in doc.get_pages().into_values() {
            pages.push((page_id, doc.get_object(page_id)?.to_owned()));
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut pages_root: Option<(ObjectId, lopdf::Dictionary)> = None;
    for (object_id, object) in objects {
        match type_name(&object) {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    catalog = Some((object_id, object));
                }
            }
            Some(b"Pages") => {
                let Ok(dictionary) = object.as_dict() else {
                    continue;
                };
                match pages_root.as_mut() {
                    Some((_, existing)) => existing.extend(dictionary),
                    None => pages_root = Some((object_id, dictionary.clone())),
                }
            }
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (Some((catalog_id, catalog)), Some((pages_id, mut pages_dict))) = (catalog, pages_root) else {
        return Err(ExportError::PdfStructure);
    };

    for (page_id, page) in &pages {
        if let Ok(dictionary) = page.as_dict() {
            let mut dictionary = dictionary.clone();
            dictionary.set("Parent", pages_id);
            merged.objects.insert(*page_id, Object::Dictionary(dictionary));
        }
    }

    pages_dict.set("Count", Object::Integer(pages.len() as i64));
    pages_dict.set(
        "Kids",
        Object::Array(pages.iter().map(|(id, _)| Object::Reference(*id)).collect()),
    );
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = catalog.as_dict()?.clone();
    catalog.set("Pages", pages_id);
    catalog.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    merged.renumber_objects();
    merged.compress();

    let mut out = Vec::new();
    merged.save_to(&mut out)?;
    Ok(Some(out))
}

/// Global PDF switches.
#[derive(Debug, Clone)]
pub struct PdfExportOptions {
    /// Convert every letter, whatever its rule says.
    pub export_all: bool,
    /// Stamp `watermark_text` on letters whose rule has no watermark of its own.
    pub watermark: bool,
    pub watermark_text: String,
}

impl Default for PdfExportOptions {
    fn default() -> Self {
        Self {
            export_all: false,
            watermark: false,
            watermark_text: "BORRADOR".to_string(),
        }
    }
}

/// Converts the letters selected by the global switch or by their own rule's
/// `export_pdf`. Returns PDF file name -> bytes, in output order.
pub fn export_pdfs(
    report: &GenerationReport,
    converter: &dyn PdfConverter,
    signer: Option<&dyn PdfSigner>,
    options: &PdfExportOptions,
) -> NamedBlobs {
    let mut pdfs = NamedBlobs::new();
    for (file_name, docx) in &report.outputs {
        let rule = report.letter_for_file(file_name).and_then(|l| l.rule.as_ref());
        if !options.export_all && !rule.is_some_and(|r| r.export_pdf) {
            continue;
        }

        let mut pdf = match converter.convert(docx, file_name) {
            Ok(pdf) => pdf,
            Err(e) => {
                log::warn!("'{}' no se convirtió a PDF: {}", file_name, e);
                continue;
            }
        };

        let watermark = rule
            .and_then(|r| r.watermark_text.as_deref())
            .or(options.watermark.then_some(options.watermark_text.as_str()));
        if let Some(text) = watermark {
            match add_text_watermark(&pdf, text) {
                Ok(stamped) => pdf = stamped,
                Err(e) => log::debug!("marca de agua omitida en '{}': {}", file_name, e),
            }
        }

        if let Some(signer) = signer {
            if rule.and_then(|r| r.sign_pdf) != Some(false) {
                match signer.sign(&pdf) {
                    Ok(signed) => pdf = signed,
                    Err(e) => log::warn!("'{}' no se firmó: {}", file_name, e),
                }
            }
        }

        let stem = file_name.strip_suffix(".docx").unwrap_or(file_name);
        log::info!("PDF generado: {}.pdf", stem);
        pdfs.insert(format!("{stem}.pdf"), pdf);
    }
    pdfs
}
