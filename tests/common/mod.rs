//! In-memory fixtures shared by the integration tests.
#![allow(dead_code)]

use generador_cartas::docx::document::paragraph_text;
use generador_cartas::docx::Document;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const TABLE_HEADERS: [&str; 4] = ["Nombre de la mesa", "Nivel", "Fecha", "Dato transformador"];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds a minimal but valid DOCX template.
#[derive(Default)]
pub struct TemplateBuilder {
    body: String,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    /// A paragraph whose text is split across one run per fragment.
    pub fn split_paragraph(mut self, fragments: &[&str]) -> Self {
        self.body.push_str("<w:p>");
        for fragment in fragments {
            self.body.push_str(&format!(
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
                escape(fragment)
            ));
        }
        self.body.push_str("</w:p>");
        self
    }

    pub fn table(mut self, headers: &[&str], rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl><w:tblPr/><w:tblGrid>");
        for _ in headers {
            self.body.push_str(r#"<w:gridCol w:w="2000"/>"#);
        }
        self.body.push_str("</w:tblGrid>");
        for row in std::iter::once(headers).chain(rows.iter().copied()) {
            self.body.push_str("<w:tr>");
            for cell in row {
                self.body.push_str(&format!(
                    r#"<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>"#,
                    escape(cell)
                ));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    /// The standard records table with one stale row to be cleared.
    pub fn records_table(self) -> Self {
        self.table(&TABLE_HEADERS, &[&["vieja", "x", "x", "x"]])
    }

    pub fn build(self) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#,
            self.body
        );
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, data) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("word/document.xml", document.as_str()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

/// A standard letter template: greeting, records table and signature line.
pub fn letter_template(title: &str) -> Vec<u8> {
    TemplateBuilder::new()
        .paragraph(title)
        .paragraph("Señor(a) {{NOMBRE DIRECTIVO}}, {{ACTOR}}")
        .records_table()
        .paragraph("{{FECHA_CARTA}}")
        .build()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn body_texts(docx: &[u8]) -> Vec<String> {
    Document::from_bytes(docx).unwrap().all_paragraph_texts()
}

/// Rows of the table at `index`, as cell texts.
pub fn table_rows(docx: &[u8], index: usize) -> Vec<Vec<String>> {
    let doc = Document::from_bytes(docx).unwrap();
    let tables = doc.tables();
    tables[index]
        .children_named("w:tr")
        .map(|row| {
            row.children_named("w:tc")
                .map(|cell| {
                    cell.children_named("w:p")
                        .map(paragraph_text)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect()
        })
        .collect()
}

pub fn part_text(docx: &[u8], part: &str) -> Option<String> {
    let doc = Document::from_bytes(docx).unwrap();
    doc.package()
        .part(part)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}
