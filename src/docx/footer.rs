//! Page-numbered footer ("Página X de Y") with optional text and logo.

use super::document::text_run;
use super::image::{add_image, max_drawing_id, picture_run};
use super::package::{
    relative_target, resolve_target, CT_FOOTER, MAIN_DOCUMENT_PART, REL_FOOTER,
};
use super::xml::{Element, Node, XmlDocument};
use super::{ns, Document, DocxError};

/// Append the footer line to the default footer of the last section.
///
/// A logo that cannot be embedded is skipped; the footer text is still added.
pub fn add_footer_with_page_numbers(
    doc: &mut Document,
    footer_text: &str,
    logo: Option<&[u8]>,
    logo_width_in: f64,
) -> Result<(), DocxError> {
    let footer_part = default_footer_part(doc)?;
    let (_, package) = doc.root_and_package_mut();

    let mut footer = if package.has_part(&footer_part) {
        package.read_xml(&footer_part)?
    } else {
        XmlDocument {
            root: Element::new("w:ftr")
                .with_attr("xmlns:w", ns::W)
                .with_attr("xmlns:r", ns::R),
        }
    };

    let next_drawing = max_drawing_id(&footer.root) + 1;
    let paragraph = footer.root.child_or_insert("w:p");

    if !footer_text.is_empty() {
        push(paragraph, text_run(&format!("{footer_text}  •  ")));
    }
    push(paragraph, text_run("Página "));
    push(paragraph, simple_field("PAGE", "1"));
    push(paragraph, text_run(" de "));
    push(paragraph, simple_field("NUMPAGES", "1"));

    if let Some(bytes) = logo {
        match add_image(package, &footer_part, bytes, logo_width_in) {
            Ok(image) => {
                push(paragraph, text_run("   "));
                push(paragraph, picture_run(&image, next_drawing)?);
            }
            Err(e) => log::debug!("logo de pie de página omitido: {}", e),
        }
    }

    package.write_xml(&footer_part, &footer)
}

fn push(paragraph: &mut Element, child: Element) {
    paragraph.children.push(Node::Element(child));
}

fn simple_field(instruction: &str, placeholder: &str) -> Element {
    Element::new("w:fldSimple")
        .with_attr("w:instr", instruction)
        .with_child(text_run(placeholder))
}

/// Part name of the default footer of the final section, creating the
/// footer part, its relationship and the section reference when missing.
fn default_footer_part(doc: &mut Document) -> Result<String, DocxError> {
    let relationships = doc.package().relationships(MAIN_DOCUMENT_PART)?;
    let (body, package) = doc.body_and_package_mut();

    let section = {
        let position = body
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(e) if e.is("w:sectPr")));
        match position {
            Some(index) => index,
            None => {
                body.children.push(Node::Element(Element::new("w:sectPr")));
                body.children.len() - 1
            }
        }
    };
    let Some(Node::Element(section)) = body.children.get_mut(section) else {
        return Err(DocxError::MissingBody);
    };

    let existing = section
        .children_named("w:footerReference")
        .find(|r| r.attr("w:type").unwrap_or("default") == "default")
        .and_then(|r| r.attr("r:id"))
        .and_then(|id| relationships.iter().find(|rel| rel.id == id))
        .map(|rel| resolve_target(MAIN_DOCUMENT_PART, &rel.target));
    if let Some(part) = existing {
        return Ok(part);
    }

    let part = package.unique_part_name("word/footer", "xml");
    let rel_id = package.add_relationship(
        MAIN_DOCUMENT_PART,
        REL_FOOTER,
        &relative_target(MAIN_DOCUMENT_PART, &part),
        false,
    )?;
    package.add_override_content_type(&part, CT_FOOTER)?;

    // a dangling default reference is replaced; first/even footers stay
    section.children.retain(|n| {
        !matches!(n, Node::Element(e)
            if e.is("w:footerReference") && e.attr("w:type").unwrap_or("default") == "default")
    });
    section.children.insert(
        0,
        Node::Element(
            Element::new("w:footerReference")
                .with_attr("xmlns:r", ns::R)
                .with_attr("w:type", "default")
                .with_attr("r:id", rel_id),
        ),
    );
    Ok(part)
}
