//! Inline pictures (`w:drawing` / `wp:inline`).

use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use super::package::{relative_target, Package, REL_IMAGE};
use super::xml::{parse_fragment, Element};
use super::{ns, DocxError};

const EMU_PER_INCH: f64 = 914_400.0;

/// An image stored in the package and related from one source part.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub rel_id: String,
    pub file_name: String,
    pub cx: u64,
    pub cy: u64,
}

/// Store `bytes` as a media part related from `source_part`, sized to
/// `width_in` inches with the original aspect ratio.
pub fn add_image(
    package: &mut Package,
    source_part: &str,
    bytes: &[u8],
    width_in: f64,
) -> Result<InlineImage, DocxError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DocxError::Image(e.to_string()))?;
    let (extension, content_type) = match reader.format() {
        Some(ImageFormat::Png) => ("png", "image/png"),
        Some(ImageFormat::Jpeg) => ("jpeg", "image/jpeg"),
        Some(ImageFormat::Gif) => ("gif", "image/gif"),
        Some(ImageFormat::Bmp) => ("bmp", "image/bmp"),
        Some(other) => return Err(DocxError::Image(format!("formato {other:?}"))),
        None => return Err(DocxError::Image("formato desconocido".to_string())),
    };
    let (width_px, height_px) = reader
        .into_dimensions()
        .map_err(|e| DocxError::Image(e.to_string()))?;
    if width_px == 0 || height_px == 0 {
        return Err(DocxError::Image("imagen vacía".to_string()));
    }

    let part_name = package.unique_part_name("word/media/image", extension);
    package.set_part(part_name.as_str(), bytes.to_vec());
    package.ensure_default_content_type(extension, content_type)?;
    let rel_id = package.add_relationship(
        source_part,
        REL_IMAGE,
        &relative_target(source_part, &part_name),
        false,
    )?;

    let cx = (width_in.max(0.1) * EMU_PER_INCH).round() as u64;
    let cy = (cx as f64 * height_px as f64 / width_px as f64).round() as u64;
    let file_name = part_name
        .rsplit('/')
        .next()
        .unwrap_or(part_name.as_str())
        .to_string();

    Ok(InlineImage {
        rel_id,
        file_name,
        cx,
        cy,
    })
}

/// A run holding the picture. Namespaces are declared locally so the
/// fragment is valid whatever the host part declares.
pub fn picture_run(image: &InlineImage, drawing_id: u32) -> Result<Element, DocxError> {
    let xml = format!(
        concat!(
            r#"<w:r xmlns:w="{w}"><w:drawing>"#,
            r#"<wp:inline xmlns:wp="{wp}" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Imagen {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{a}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{pic}">"#,
            r#"<pic:pic xmlns:pic="{pic}">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip xmlns:r="{r}" r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
        ),
        w = ns::W,
        wp = ns::WP,
        a = ns::A,
        pic = ns::PIC,
        r = ns::R,
        cx = image.cx,
        cy = image.cy,
        id = drawing_id,
        name = image.file_name,
        rel = image.rel_id,
    );
    let mut run = parse_fragment(&xml)?;
    // the host part already binds `w`; keep the run attribute-free like Word does
    run.attributes.clear();
    Ok(run)
}

/// Highest `wp:docPr` id under `element`.
pub fn max_drawing_id(element: &Element) -> u32 {
    let mut max = 0;
    element.walk(&mut |e| {
        if e.is("wp:docPr") {
            if let Some(id) = e.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                max = max.max(id);
            }
        }
    });
    max
}
