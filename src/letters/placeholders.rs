//! Text and image placeholder substitution.
//!
//! Each key is accepted as `{{KEY}}`, `{{KEY_WITH_UNDERSCORES}}` and the bare
//! uppercase forms. A paragraph is rewritten only when one of its tokens is
//! found; its runs are then replaced by one plain run (inline formatting of
//! that paragraph is lost), followed by any pictures.

use indexmap::IndexMap;

use crate::docx::document::{paragraph_text, text_run};
use crate::docx::image::{add_image, max_drawing_id, picture_run};
use crate::docx::package::{Package, MAIN_DOCUMENT_PART};
use crate::docx::xml::{Element, Node};
use crate::docx::Document;

/// Token spellings of a key: wrapped forms first, then bare ones.
pub fn expand_token_variants(key: &str) -> Vec<String> {
    let mut upper: Vec<String> = Vec::with_capacity(2);
    for candidate in [key.to_uppercase(), key.replace(' ', "_").to_uppercase()] {
        if !upper.contains(&candidate) {
            upper.push(candidate);
        }
    }
    upper
        .iter()
        .map(|u| format!("{{{{{u}}}}}"))
        .chain(upper.iter().cloned())
        .collect()
}

/// Token -> value, keeping the first position of a token and the last value
/// assigned to it.
fn token_table<V: Clone>(map: &IndexMap<String, V>) -> IndexMap<String, V> {
    let mut tokens = IndexMap::new();
    for (key, value) in map {
        for token in expand_token_variants(key) {
            if token.is_empty() {
                continue;
            }
            tokens.insert(token, value.clone());
        }
    }
    tokens
}

struct Substitution<'a> {
    text: IndexMap<String, String>,
    images: IndexMap<String, &'a [u8]>,
    image_width_in: f64,
    next_drawing_id: u32,
}

impl Substitution<'_> {
    fn process_paragraph(&mut self, paragraph: &mut Element, package: &mut Package) {
        let mut full = paragraph_text(paragraph);
        let mut changed = false;
        let mut pictures = Vec::new();

        for (token, bytes) in &self.images {
            if !full.contains(token.as_str()) {
                continue;
            }
            full = full.replace(token.as_str(), "");
            changed = true;
            let picture = add_image(package, MAIN_DOCUMENT_PART, bytes, self.image_width_in)
                .and_then(|image| picture_run(&image, self.next_drawing_id));
            match picture {
                Ok(run) => {
                    pictures.push(run);
                    self.next_drawing_id += 1;
                }
                Err(e) => log::debug!("imagen para '{}' omitida: {}", token, e),
            }
        }

        for (token, value) in &self.text {
            if full.contains(token.as_str()) {
                full = full.replace(token.as_str(), value);
                changed = true;
            }
        }

        if changed {
            paragraph.remove_children_named("w:r");
            paragraph.children.push(Node::Element(text_run(&full)));
            paragraph
                .children
                .extend(pictures.into_iter().map(Node::Element));
        }
    }
}

/// Substitutes every token in body paragraphs, then in the paragraphs of
/// every body table (row by row, cell by cell). Images that cannot be
/// embedded are dropped; their token is still removed.
pub fn replace_text_and_images(
    doc: &mut Document,
    text_map: &IndexMap<String, String>,
    image_map: &IndexMap<String, Vec<u8>>,
    image_width_in: f64,
) {
    let images: IndexMap<String, &[u8]> = image_map
        .iter()
        .map(|(k, v)| (k.clone(), v.as_slice()))
        .collect();
    let (body, package) = doc.body_and_package_mut();
    let mut substitution = Substitution {
        text: token_table(text_map),
        images: token_table(&images),
        image_width_in,
        next_drawing_id: max_drawing_id(body) + 1,
    };

    for paragraph in body.children_named_mut("w:p") {
        substitution.process_paragraph(paragraph, package);
    }
    for table in body.children_named_mut("w:tbl") {
        for row in table.children_named_mut("w:tr") {
            for cell in row.children_named_mut("w:tc") {
                for paragraph in cell.children_named_mut("w:p") {
                    substitution.process_paragraph(paragraph, package);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::parse_fragment;

    #[test]
    fn test_expand_token_variants() {
        assert_eq!(expand_token_variants("ACTOR"), ["{{ACTOR}}", "ACTOR"]);
        assert_eq!(
            expand_token_variants("Nombre Directivo"),
            [
                "{{NOMBRE DIRECTIVO}}",
                "{{NOMBRE_DIRECTIVO}}",
                "NOMBRE DIRECTIVO",
                "NOMBRE_DIRECTIVO"
            ]
        );
    }

    #[test]
    fn test_unchanged_paragraph_keeps_runs() {
        let mut p = parse_fragment(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Sin marcadores</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let before = p.clone();
        let mut package = Package::default();
        let mut s = Substitution {
            text: token_table(&IndexMap::from([("ACTOR".to_string(), "Juan".to_string())])),
            images: IndexMap::new(),
            image_width_in: 1.5,
            next_drawing_id: 1,
        };
        s.process_paragraph(&mut p, &mut package);
        assert_eq!(p, before);
    }

    #[test]
    fn test_split_token_collapses_runs() {
        let mut p = parse_fragment(
            r#"<w:p><w:pPr/><w:r><w:t>Estimado {{AC</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>TOR}}</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let mut package = Package::default();
        let mut s = Substitution {
            text: token_table(&IndexMap::from([("ACTOR".to_string(), "Juan Pérez".to_string())])),
            images: IndexMap::new(),
            image_width_in: 1.5,
            next_drawing_id: 1,
        };
        s.process_paragraph(&mut p, &mut package);
        assert_eq!(paragraph_text(&p), "Estimado Juan Pérez");
        assert_eq!(p.children_named("w:r").count(), 1);
        assert!(p.child("w:pPr").is_some());
    }

    #[test]
    fn test_broken_image_consumes_token() {
        let mut p = parse_fragment(r#"<w:p><w:r><w:t>Firma: {{IMG_FIRMA}}</w:t></w:r></w:p>"#).unwrap();
        let mut package = Package::default();
        let broken: &[u8] = b"no es una imagen";
        let mut s = Substitution {
            text: IndexMap::new(),
            images: token_table(&IndexMap::from([("IMG_FIRMA".to_string(), broken)])),
            image_width_in: 1.5,
            next_drawing_id: 1,
        };
        s.process_paragraph(&mut p, &mut package);
        assert_eq!(paragraph_text(&p), "Firma: ");
        let mut drawings = 0;
        p.walk(&mut |e| {
            if e.is("w:drawing") {
                drawings += 1;
            }
        });
        assert_eq!(drawings, 0);
    }
}
