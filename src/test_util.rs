use anyhow::anyhow;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::documents::pdf::page_size;
use crate::languages::TargetLanguage;
use crate::providers::{Provider, ProviderFuture};

/// Returns `"[<code>] <text>"`.
#[derive(Debug, Clone)]
pub(crate) struct PrefixProvider;

impl Provider for PrefixProvider {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn translate(&self, text: &str, target: TargetLanguage) -> ProviderFuture {
        let translated = format!("[{}] {}", target.code(), text);
        Box::pin(async move { Ok(translated) })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FailingProvider;

impl Provider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn translate(&self, _text: &str, _target: TargetLanguage) -> ProviderFuture {
        Box::pin(async move { Err(anyhow!("service unavailable")) })
    }
}

/// Prefixes like [`PrefixProvider`] and keeps every input it was asked to translate.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingProvider {
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingProvider {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Provider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn translate(&self, text: &str, target: TargetLanguage) -> ProviderFuture {
        self.calls
            .lock()
            .expect("calls lock")
            .push(text.to_string());
        let translated = format!("[{}] {}", target.code(), text);
        Box::pin(async move { Ok(translated) })
    }
}

pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body = paragraphs
        .iter()
        .map(|text| {
            if text.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!(
                    "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                    escape_xml(text)
                )
            }
        })
        .collect::<String>();
    build_docx_with_body(&body)
}

pub(crate) fn build_docx_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
            "<w:body>{}<w:sectPr/></w:body></w:document>"
        ),
        body
    );
    let content_types = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        "<Override PartName=\"/word/document.xml\" ",
        "ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
        "</Types>"
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in [
        ("[Content_Types].xml", content_types.to_string()),
        ("word/document.xml", document),
    ] {
        writer
            .start_file(name, FileOptions::default())
            .expect("start zip entry");
        writer.write_all(data.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub(crate) fn read_zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
    let mut file = archive.by_name(name).expect("zip entry");
    let mut content = String::new();
    file.read_to_string(&mut content).expect("read zip entry");
    content
}

/// A PDF with one page per entry of `pages`, every page `width` x `height` points.
pub(crate) fn build_pdf(pages: &[&str], width: f32, height: f32) -> Vec<u8> {
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    let width_mm = Mm(width * 25.4 / 72.0);
    let height_mm = Mm(height * 25.4 / 72.0);
    let (doc, first_page, first_layer) =
        PdfDocument::new("fixture", width_mm, height_mm, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .expect("builtin font");

    let mut texts = pages.iter();
    if let Some(text) = texts.next() {
        doc.get_page(first_page)
            .get_layer(first_layer)
            .use_text(*text, 12.0, Mm(25.4), Mm(50.0), &font);
    }
    for (index, text) in texts.enumerate() {
        let (page, layer) = doc.add_page(width_mm, height_mm, format!("Layer {}", index + 2));
        doc.get_page(page)
            .get_layer(layer)
            .use_text(*text, 12.0, Mm(25.4), Mm(50.0), &font);
    }

    let mut buffer = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut buffer);
        doc.save(&mut writer).expect("save pdf");
    }
    buffer
}

pub(crate) fn pdf_page_sizes(bytes: &[u8]) -> Vec<(f32, f32)> {
    let document = lopdf::Document::load_mem(bytes).expect("load pdf");
    document
        .get_pages()
        .values()
        .map(|&page_id| page_size(&document, page_id).expect("page size"))
        .collect()
}

pub(crate) fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 0.5,
        "expected {} to be within 0.5 of {}",
        actual,
        expected
    );
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
