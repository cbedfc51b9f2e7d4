//! Body-level access to a DOCX main document part.

use super::package::{Package, MAIN_DOCUMENT_PART};
use super::xml::{Element, Node, XmlDocument};
use super::DocxError;

#[derive(Debug, Clone)]
pub struct Document {
    package: Package,
    main: XmlDocument,
}

impl Document {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let package = Package::open(bytes)?;
        let main = package.read_xml(MAIN_DOCUMENT_PART)?;
        if main.root.child("w:body").is_none() {
            return Err(DocxError::MissingBody);
        }
        Ok(Self { package, main })
    }

    /// Serialise the document back into DOCX bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut package = self.package.clone();
        package.write_xml(MAIN_DOCUMENT_PART, &self.main)?;
        package.to_bytes()
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn body(&self) -> &Element {
        // presence checked in `from_bytes`
        self.main
            .root
            .child("w:body")
            .unwrap_or(&self.main.root)
    }

    pub fn body_mut(&mut self) -> &mut Element {
        self.main.root.child_or_insert("w:body")
    }

    /// Split borrow of the body and the package, for edits that add parts or
    /// relationships while walking the tree.
    pub fn body_and_package_mut(&mut self) -> (&mut Element, &mut Package) {
        let Self { package, main } = self;
        (main.root.child_or_insert("w:body"), package)
    }

    pub(crate) fn root_and_package_mut(&mut self) -> (&mut Element, &mut Package) {
        let Self { package, main } = self;
        (&mut main.root, package)
    }

    /// Body-level paragraphs, in document order.
    pub fn paragraphs(&self) -> Vec<&Element> {
        self.body().children_named("w:p").collect()
    }

    /// Body-level tables, in document order.
    pub fn tables(&self) -> Vec<&Element> {
        self.body().children_named("w:tbl").collect()
    }

    pub fn table_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.body_mut().children_named_mut("w:tbl").nth(index)
    }

    /// Text of every body paragraph followed by every table-cell paragraph.
    pub fn all_paragraph_texts(&self) -> Vec<String> {
        let mut out: Vec<String> = self.paragraphs().into_iter().map(paragraph_text).collect();
        for table in self.tables() {
            for row in table.children_named("w:tr") {
                for cell in row.children_named("w:tc") {
                    out.extend(cell.children_named("w:p").map(paragraph_text));
                }
            }
        }
        out
    }
}

/// Text of a single run: `w:t` content, tabs and breaks.
pub fn run_text(run: &Element) -> String {
    let mut out = String::new();
    for child in run.elements() {
        match child.name.as_str() {
            "w:t" => out.push_str(&child.text_content()),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            "w:noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
    out
}

/// Concatenated text of the direct runs of a paragraph.
pub fn paragraph_text(paragraph: &Element) -> String {
    paragraph
        .children_named("w:r")
        .map(run_text)
        .collect::<String>()
}

/// Build a plain run; tabs and newlines become `w:tab` / `w:br`.
pub fn text_run(text: &str) -> Element {
    let mut run = Element::new("w:r");
    let mut buffer = String::new();
    let flush = |buffer: &mut String, run: &mut Element| {
        if !buffer.is_empty() {
            run.children.push(Node::Element(
                Element::new("w:t")
                    .with_attr("xml:space", "preserve")
                    .with_text(std::mem::take(buffer)),
            ));
        }
    };
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut buffer, &mut run);
                run.children.push(Node::Element(Element::new("w:tab")));
            }
            '\n' => {
                flush(&mut buffer, &mut run);
                run.children.push(Node::Element(Element::new("w:br")));
            }
            other => buffer.push(other),
        }
    }
    flush(&mut buffer, &mut run);
    run
}

/// A paragraph holding `text` in a single run (no run for empty text).
pub fn paragraph_with_text(text: &str) -> Element {
    let mut paragraph = Element::new("w:p");
    if !text.is_empty() {
        paragraph.children.push(Node::Element(text_run(text)));
    }
    paragraph
}

/// Grid column widths of a table, if it declares a `w:tblGrid`.
pub fn grid_widths(table: &Element) -> Vec<Option<String>> {
    table
        .child("w:tblGrid")
        .map(|grid| {
            grid.children_named("w:gridCol")
                .map(|col| col.attr("w:w").map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Column count: grid columns, or the widest row when the grid is absent.
pub fn column_count(table: &Element) -> usize {
    let grid = grid_widths(table).len();
    if grid > 0 {
        return grid;
    }
    table
        .children_named("w:tr")
        .map(|row| row.children_named("w:tc").count())
        .max()
        .unwrap_or(0)
}

/// Text of a table cell, paragraphs joined by newlines.
pub fn cell_text(cell: &Element) -> String {
    cell.children_named("w:p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}
