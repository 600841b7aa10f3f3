use anyhow::{Context, Result, anyhow};
use lopdf::{Document, Object, ObjectId};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::warn;

use super::{DocumentError, DocumentKind};
use crate::settings::Settings;

/// Parent chain limit when resolving an inherited MediaBox.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Text and geometry read from a source PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfSource {
    /// Plain text of every page, in page order.
    pub pages: Vec<String>,
    /// First page width in points.
    pub width: f32,
    /// First page height in points.
    pub height: f32,
}

/// How the translated text is placed on the output page. Lengths are in points.
#[derive(Debug, Clone)]
pub struct PdfLayout {
    pub font_size: f32,
    pub margin: f32,
    pub line_spacing: f32,
    pub font_path: Option<PathBuf>,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            margin: 72.0,
            line_spacing: 1.2,
            font_path: None,
        }
    }
}

impl PdfLayout {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            font_size: settings.pdf_font_size,
            margin: settings.pdf_margin,
            line_spacing: settings.pdf_line_spacing,
            font_path: settings.pdf_font_path.as_ref().map(PathBuf::from),
        }
    }
}

pub fn extract(bytes: &[u8]) -> Result<PdfSource, DocumentError> {
    load_source(bytes).map_err(|err| DocumentError::parse(DocumentKind::Pdf, err))
}

/// Builds a new single-page document of `width` x `height` points holding
/// `text` as one block from the top-left margin. Lines are not wrapped and
/// text past the bottom edge is clipped.
pub fn build_translated_document(
    text: &str,
    width: f32,
    height: f32,
    layout: &PdfLayout,
) -> Result<Vec<u8>, DocumentError> {
    render_text_page(text, width, height, layout)
        .map_err(|err| DocumentError::write(DocumentKind::Pdf, err))
}

fn load_source(bytes: &[u8]) -> Result<PdfSource> {
    let document = Document::load_mem(bytes).with_context(|| "failed to load pdf")?;
    if document.is_encrypted() {
        return Err(anyhow!("encrypted pdf is not supported"));
    }

    let pages = document.get_pages();
    let first_page = pages
        .values()
        .next()
        .copied()
        .ok_or_else(|| anyhow!("pdf has no pages"))?;
    let (width, height) = page_size(&document, first_page)?;

    let mut texts = Vec::with_capacity(pages.len());
    for &number in pages.keys() {
        match document.extract_text(&[number]) {
            Ok(text) => texts.push(text),
            Err(err) => {
                warn!("failed to extract text from pdf page {}: {}", number, err);
                texts.push(String::new());
            }
        }
    }

    Ok(PdfSource {
        pages: texts,
        width,
        height,
    })
}

/// Size of a page in points, following `Parent` links for an inherited MediaBox.
pub(crate) fn page_size(document: &Document, page_id: ObjectId) -> Result<(f32, f32)> {
    let mut node = document
        .get_dictionary(page_id)
        .with_context(|| "failed to read pdf page")?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(media_box) = node.get(b"MediaBox") {
            return media_box_size(document, media_box);
        }
        let parent = node
            .get(b"Parent")
            .and_then(Object::as_reference)
            .with_context(|| "pdf page has no MediaBox")?;
        node = document
            .get_dictionary(parent)
            .with_context(|| "failed to read pdf page tree")?;
    }
    Err(anyhow!("pdf page tree is too deep"))
}

fn media_box_size(document: &Document, object: &Object) -> Result<(f32, f32)> {
    let object = match object {
        Object::Reference(id) => document
            .get_object(*id)
            .with_context(|| "failed to resolve MediaBox")?,
        other => other,
    };
    let values = object
        .as_array()
        .with_context(|| "MediaBox is not an array")?
        .iter()
        .map(|value| resolve_number(document, value))
        .collect::<Result<Vec<_>>>()?;
    let &[x0, y0, x1, y1] = &values[..] else {
        return Err(anyhow!("MediaBox must have 4 entries, found {}", values.len()));
    };
    let width = (x1 - x0).abs();
    let height = (y1 - y0).abs();
    if width <= 0.0 || height <= 0.0 {
        return Err(anyhow!("MediaBox has an empty area"));
    }
    Ok((width, height))
}

fn resolve_number(document: &Document, object: &Object) -> Result<f32> {
    match object {
        Object::Integer(value) => Ok(*value as f32),
        Object::Real(value) => Ok(*value as f32),
        Object::Reference(id) => {
            let target = document
                .get_object(*id)
                .with_context(|| "failed to resolve MediaBox entry")?;
            match target {
                Object::Reference(_) => Err(anyhow!("nested reference in MediaBox")),
                other => resolve_number(document, other),
            }
        }
        other => Err(anyhow!("expected a number in MediaBox, found {:?}", other)),
    }
}

fn render_text_page(text: &str, width: f32, height: f32, layout: &PdfLayout) -> Result<Vec<u8>> {
    use printpdf::{BuiltinFont, PdfDocument};

    let (doc, page, layer) =
        PdfDocument::new("translated", pt_to_mm(width), pt_to_mm(height), "Layer 1");
    let font = match layout.font_path.as_deref() {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open pdf font: {}", path.display()))?;
            doc.add_external_font(file)
                .with_context(|| format!("failed to load pdf font: {}", path.display()))?
        }
        None => {
            if text.chars().any(|c| u32::from(c) > 0xFF) {
                warn!("text has characters outside Latin-1; set pdf.font_path to render them");
            }
            doc.add_builtin_font(BuiltinFont::Helvetica)
                .with_context(|| "failed to load built-in pdf font")?
        }
    };

    let current_layer = doc.get_page(page).get_layer(layer);
    current_layer.begin_text_section();
    current_layer.set_font(&font, layout.font_size);
    current_layer.set_line_height(layout.font_size * layout.line_spacing);
    current_layer.set_text_cursor(pt_to_mm(layout.margin), pt_to_mm(height - layout.margin));
    for line in text.lines() {
        current_layer.write_text(line, &font);
        current_layer.add_line_break();
    }
    current_layer.end_text_section();

    let mut buffer = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buffer);
        doc.save(&mut writer).with_context(|| "failed to write pdf")?;
    }
    Ok(buffer)
}

fn pt_to_mm(pt: f32) -> printpdf::Mm {
    printpdf::Mm(pt * 25.4 / 72.0)
}
