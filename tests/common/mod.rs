#![allow(dead_code)]

use anyhow::anyhow;
use axum::Router;
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::ZipWriter;
use zip::write::FileOptions;

use doc_translator_rust::documents::docx::DocxDocument;
use doc_translator_rust::documents::pdf::PdfLayout;
use doc_translator_rust::server::{AppState, router};
use doc_translator_rust::{Pipeline, Provider, ProviderFuture, TargetLanguage, Translator};

pub const BOUNDARY: &str = "doc-translator-test-boundary";

#[derive(Debug, Clone)]
pub struct PrefixProvider;

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
pub struct FailingProvider;

impl Provider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn translate(&self, _text: &str, _target: TargetLanguage) -> ProviderFuture {
        Box::pin(async move { Err(anyhow!("service unavailable")) })
    }
}

pub fn app<P: Provider + 'static>(provider: P) -> Router {
    app_with_limit(provider, 8 * 1024 * 1024)
}

pub fn app_with_limit<P: Provider + 'static>(provider: P, max_upload_bytes: usize) -> Router {
    let pipeline = Pipeline::new(Translator::new(provider), PdfLayout::default());
    let state = AppState::new(pipeline, max_upload_bytes).expect("app state");
    router(Arc::new(state))
}

pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body = paragraphs
        .iter()
        .map(|text| {
            if text.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", escape_xml(text))
            }
        })
        .collect::<String>();
    let document = format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
            "<w:body>{}</w:body></w:document>"
        ),
        body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", FileOptions::default())
        .expect("start zip entry");
    writer
        .write_all(document.as_bytes())
        .expect("write zip entry");
    writer.finish().expect("finish zip").into_inner()
}

pub fn docx_paragraphs(bytes: &[u8]) -> Vec<String> {
    DocxDocument::open(bytes)
        .expect("open docx")
        .paragraphs()
        .map(|(_, text)| text.to_string())
        .collect()
}

pub fn build_pdf(pages: &[&str], width: f32, height: f32) -> Vec<u8> {
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

pub fn pdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("load pdf")
        .get_pages()
        .len()
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
