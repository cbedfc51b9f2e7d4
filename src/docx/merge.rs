//! Consolidation of several letters into a single DOCX.
//!
//! Documents are appended, in name order, to the first one. Styles,
//! numbering and headers/footers of the appended documents are not merged:
//! they take the first document's definitions.

use std::collections::{BTreeSet, HashMap};

use super::package::{relative_target, resolve_target, MAIN_DOCUMENT_PART};
use super::xml::{Element, Node};
use super::{Document, DocxError};
use crate::NamedBlobs;

const RELATIONSHIP_ATTRIBUTES: [&str; 3] = ["r:embed", "r:id", "r:link"];

/// Merge every document into one, or `None` when there is nothing to merge.
pub fn merge_documents_docx(named_docs: &NamedBlobs) -> Result<Option<Vec<u8>>, DocxError> {
    let mut names: Vec<&String> = named_docs.keys().collect();
    names.sort();
    let Some((first, rest)) = names.split_first() else {
        return Ok(None);
    };

    let mut master = Document::from_bytes(&named_docs[*first])?;
    for name in rest {
        let other = Document::from_bytes(&named_docs[*name])?;
        append_document(&mut master, &other)?;
    }

    let mut next_id = 1u32;
    master.body_mut().walk_mut(&mut |e| {
        if e.is("wp:docPr") {
            e.set_attr("id", next_id.to_string());
            next_id += 1;
        }
    });

    Ok(Some(master.to_bytes()?))
}

fn append_document(master: &mut Document, other: &Document) -> Result<(), DocxError> {
    let mut blocks: Vec<Element> = other
        .body()
        .elements()
        .filter(|e| !e.is("w:sectPr"))
        .cloned()
        .collect();

    let mut referenced = BTreeSet::new();
    for block in &blocks {
        block.walk(&mut |e| {
            for (key, value) in &e.attributes {
                if RELATIONSHIP_ATTRIBUTES.contains(&key.as_str()) {
                    referenced.insert(value.clone());
                }
            }
        });
    }

    let source_rels = other.package().relationships(MAIN_DOCUMENT_PART)?;
    let (body, package) = master.body_and_package_mut();
    let mut remap: HashMap<String, String> = HashMap::new();

    for rel in source_rels.iter().filter(|r| referenced.contains(&r.id)) {
        let target = if rel.external {
            rel.target.clone()
        } else {
            let source_part = resolve_target(MAIN_DOCUMENT_PART, &rel.target);
            let Some(data) = other.package().part(&source_part) else {
                log::debug!("relación {} apunta a una parte inexistente", rel.id);
                continue;
            };
            let (stem, extension) = split_part_name(&source_part);
            let new_part = package.unique_part_name(stem, extension);
            package.set_part(new_part.as_str(), data.to_vec());
            let content_type = mime_guess::from_ext(extension).first_or_octet_stream();
            package.ensure_default_content_type(extension, content_type.essence_str())?;
            relative_target(MAIN_DOCUMENT_PART, &new_part)
        };
        let new_id = package.add_relationship(MAIN_DOCUMENT_PART, &rel.rel_type, &target, rel.external)?;
        remap.insert(rel.id.clone(), new_id);
    }

    for block in &mut blocks {
        block.walk_mut(&mut |e| {
            for (key, value) in e.attributes.iter_mut() {
                if RELATIONSHIP_ATTRIBUTES.contains(&key.as_str()) {
                    if let Some(new_id) = remap.get(value.as_str()) {
                        *value = new_id.clone();
                    }
                }
            }
        });
    }

    let insert_at = body
        .children
        .iter()
        .rposition(|n| matches!(n, Node::Element(e) if e.is("w:sectPr")))
        .unwrap_or(body.children.len());
    let page_break = Element::new("w:p").with_child(
        Element::new("w:r").with_child(Element::new("w:br").with_attr("w:type", "page")),
    );
    let incoming = std::iter::once(page_break)
        .chain(blocks)
        .map(Node::Element);
    body.children.splice(insert_at..insert_at, incoming);
    Ok(())
}

/// `word/media/image12.png` -> (`word/media/image`, `png`)
fn split_part_name(part: &str) -> (&str, &str) {
    let (base, extension) = part.rsplit_once('.').unwrap_or((part, "bin"));
    (base.trim_end_matches(|c: char| c.is_ascii_digit()), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_part_name() {
        assert_eq!(split_part_name("word/media/image12.png"), ("word/media/image", "png"));
        assert_eq!(split_part_name("word/embeddings/obj"), ("word/embeddings/obj", "bin"));
    }

    #[test]
    fn test_merge_of_nothing_is_none() {
        assert!(merge_documents_docx(&NamedBlobs::new()).unwrap().is_none());
    }
}
