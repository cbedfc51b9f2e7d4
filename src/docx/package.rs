//! OPC package handling: ZIP parts, relationships and content types.

use indexmap::IndexMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xml::{Element, XmlDocument};
use super::DocxError;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_FOOTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
pub const CT_FOOTER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// A single relationship entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Raw package contents, keyed by part name in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: IndexMap<String, Vec<u8>>,
}

impl Package {
    pub fn open(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = IndexMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.insert(file.name().to_string(), data);
        }

        if !parts.contains_key(MAIN_DOCUMENT_PART) {
            return Err(DocxError::MissingPart(MAIN_DOCUMENT_PART.to_string()));
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn set_part(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.parts.insert(name.into(), data);
    }

    pub fn read_xml(&self, name: &str) -> Result<XmlDocument, DocxError> {
        let data = self
            .part(name)
            .ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
        Ok(XmlDocument::parse(data)?)
    }

    pub fn write_xml(&mut self, name: &str, doc: &XmlDocument) -> Result<(), DocxError> {
        let bytes = doc.to_bytes()?;
        self.set_part(name, bytes);
        Ok(())
    }

    /// Serialise the package; the content types part always goes first.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        if let Some(data) = self.parts.get(CONTENT_TYPES_PART) {
            writer.start_file(CONTENT_TYPES_PART, options)?;
            writer.write_all(data)?;
        }
        for (name, data) in &self.parts {
            if name == CONTENT_TYPES_PART {
                continue;
            }
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Relationships declared by `source_part`.
    pub fn relationships(&self, source_part: &str) -> Result<Vec<Relationship>, DocxError> {
        let rels_name = rels_part_for(source_part);
        if !self.has_part(&rels_name) {
            return Ok(Vec::new());
        }
        let doc = self.read_xml(&rels_name)?;
        Ok(doc
            .root
            .children_named("Relationship")
            .map(|rel| Relationship {
                id: rel.attr("Id").unwrap_or_default().to_string(),
                rel_type: rel.attr("Type").unwrap_or_default().to_string(),
                target: rel.attr("Target").unwrap_or_default().to_string(),
                external: rel.attr("TargetMode") == Some("External"),
            })
            .collect())
    }

    /// Append a relationship to `source_part` and return its new id.
    pub fn add_relationship(
        &mut self,
        source_part: &str,
        rel_type: &str,
        target: &str,
        external: bool,
    ) -> Result<String, DocxError> {
        let rels_name = rels_part_for(source_part);
        let mut doc = if self.has_part(&rels_name) {
            self.read_xml(&rels_name)?
        } else {
            XmlDocument {
                root: Element::new("Relationships").with_attr("xmlns", RELS_NS),
            }
        };

        let next = doc
            .root
            .children_named("Relationship")
            .filter_map(|rel| rel.attr("Id"))
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");

        let mut rel = Element::new("Relationship")
            .with_attr("Id", id.as_str())
            .with_attr("Type", rel_type)
            .with_attr("Target", target);
        if external {
            rel.set_attr("TargetMode", "External");
        }
        doc.root.children.push(super::xml::Node::Element(rel));
        self.write_xml(&rels_name, &doc)?;
        Ok(id)
    }

    /// Register `extension` with a default content type unless already known.
    pub fn ensure_default_content_type(
        &mut self,
        extension: &str,
        content_type: &str,
    ) -> Result<(), DocxError> {
        let mut doc = self.content_types()?;
        let known = doc.root.children_named("Default").any(|d| {
            d.attr("Extension")
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        });
        if !known {
            doc.root.children.push(super::xml::Node::Element(
                Element::new("Default")
                    .with_attr("Extension", extension)
                    .with_attr("ContentType", content_type),
            ));
            self.write_xml(CONTENT_TYPES_PART, &doc)?;
        }
        Ok(())
    }

    pub fn add_override_content_type(
        &mut self,
        part_name: &str,
        content_type: &str,
    ) -> Result<(), DocxError> {
        let mut doc = self.content_types()?;
        let part_name = format!("/{}", part_name.trim_start_matches('/'));
        doc.root
            .children
            .retain(|n| !matches!(n, super::xml::Node::Element(e) if e.is("Override") && e.attr("PartName") == Some(part_name.as_str())));
        doc.root.children.push(super::xml::Node::Element(
            Element::new("Override")
                .with_attr("PartName", part_name)
                .with_attr("ContentType", content_type),
        ));
        self.write_xml(CONTENT_TYPES_PART, &doc)
    }

    fn content_types(&self) -> Result<XmlDocument, DocxError> {
        if self.has_part(CONTENT_TYPES_PART) {
            self.read_xml(CONTENT_TYPES_PART)
        } else {
            Ok(XmlDocument {
                root: Element::new("Types").with_attr("xmlns", CONTENT_TYPES_NS),
            })
        }
    }

    /// First free part name of the form `{prefix}{n}.{ext}`.
    pub fn unique_part_name(&self, prefix: &str, extension: &str) -> String {
        (1..)
            .map(|n| format!("{prefix}{n}.{extension}"))
            .find(|name| !self.has_part(name))
            .unwrap_or_else(|| format!("{prefix}.{extension}"))
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
pub fn rels_part_for(source_part: &str) -> String {
    match source_part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{source_part}.rels"),
    }
}

/// Resolve a relationship target relative to the directory of `source_part`.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Inverse of [`resolve_target`] for parts living under the same directory.
pub fn relative_target(source_part: &str, part_name: &str) -> String {
    match source_part.rsplit_once('/') {
        Some((dir, _)) => part_name
            .strip_prefix(&format!("{dir}/"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{part_name}")),
        None => part_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_part_for() {
        assert_eq!(rels_part_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_part_for("word/footer1.xml"), "word/_rels/footer1.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word/document.xml", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word/document.xml", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("word/document.xml", "/word/footer2.xml"), "word/footer2.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("word/document.xml", "word/media/image3.png"), "media/image3.png");
        assert_eq!(relative_target("word/document.xml", "customXml/a.xml"), "/customXml/a.xml");
    }
}
