use anyhow::{Context, Result, anyhow};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{DocumentError, DocumentKind};

const DOCUMENT_PART: &str = "word/document.xml";
const PARAGRAPH_TAG: &[u8] = b"w:p";
const TEXT_TAG: &[u8] = b"w:t";

/// Position of a paragraph inside an opened [`DocxDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParagraphHandle(usize);

impl ParagraphHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An opened word-processing document.
///
/// Every `w:p` element of `word/document.xml` is a paragraph, in document
/// order, with its text being the concatenation of its `w:t` runs. All other
/// archive entries are kept as read and written back unchanged.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    entries: Vec<ArchiveEntry>,
    document_index: usize,
    paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone)]
struct ArchiveEntry {
    name: String,
    compression: CompressionMethod,
    is_dir: bool,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Paragraph {
    text: String,
    replacement: Option<String>,
}

impl DocxDocument {
    pub fn open(bytes: &[u8]) -> Result<Self, DocumentError> {
        read_document(bytes).map_err(|err| DocumentError::parse(DocumentKind::Docx, err))
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Paragraphs in document order with their current text.
    pub fn paragraphs(&self) -> impl Iterator<Item = (ParagraphHandle, &str)> + '_ {
        self.paragraphs
            .iter()
            .enumerate()
            .map(|(index, paragraph)| (ParagraphHandle(index), paragraph.current()))
    }

    pub fn text(&self, handle: ParagraphHandle) -> Option<&str> {
        self.paragraphs.get(handle.0).map(Paragraph::current)
    }

    pub fn replace(&mut self, handle: ParagraphHandle, text: impl Into<String>) {
        if let Some(paragraph) = self.paragraphs.get_mut(handle.0) {
            paragraph.replacement = Some(text.into());
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        self.write_archive()
            .map_err(|err| DocumentError::write(DocumentKind::Docx, err))
    }

    fn write_archive(&self) -> Result<Vec<u8>> {
        let replacements = self
            .paragraphs
            .iter()
            .map(|paragraph| paragraph.replacement.as_deref())
            .collect::<Vec<_>>();
        let document_xml = if replacements.iter().any(Option::is_some) {
            Some(rewrite_paragraphs(
                &self.entries[self.document_index].data,
                &replacements,
            )?)
        } else {
            None
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (index, entry) in self.entries.iter().enumerate() {
            let options = FileOptions::default().compression_method(entry.compression);
            if entry.is_dir {
                writer
                    .add_directory(entry.name.clone(), options)
                    .with_context(|| "failed to write zip directory")?;
                continue;
            }
            let data = match document_xml.as_ref() {
                Some(xml) if index == self.document_index => xml,
                _ => &entry.data,
            };
            writer
                .start_file(entry.name.clone(), options)
                .with_context(|| "failed to write zip entry")?;
            writer
                .write_all(data)
                .with_context(|| "failed to write zip content")?;
        }

        let bytes = writer
            .finish()
            .with_context(|| "failed to finalize zip output")?
            .into_inner();
        Ok(bytes)
    }
}

impl Paragraph {
    fn current(&self) -> &str {
        self.replacement.as_deref().unwrap_or(&self.text)
    }
}

fn read_document(bytes: &[u8]) -> Result<DocxDocument> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).with_context(|| "failed to read zip archive")?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| "failed to read zip entry")?;
        let mut data = Vec::new();
        if !file.is_dir() {
            file.read_to_end(&mut data)
                .with_context(|| format!("failed to read zip entry content: {}", file.name()))?;
        }
        let compression = match file.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            compression,
            is_dir: file.is_dir(),
            data,
        });
    }

    let document_index = entries
        .iter()
        .position(|entry| entry.name == DOCUMENT_PART)
        .ok_or_else(|| anyhow!("missing {} (not a word-processing document)", DOCUMENT_PART))?;
    let paragraphs = scan_paragraphs(&entries[document_index].data)?
        .into_iter()
        .map(|text| Paragraph {
            text,
            replacement: None,
        })
        .collect();

    Ok(DocxDocument {
        entries,
        document_index,
        paragraphs,
    })
}

fn scan_paragraphs(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut open = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                PARAGRAPH_TAG => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                TEXT_TAG => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == PARAGRAPH_TAG {
                    paragraphs.push(String::new());
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                PARAGRAPH_TAG => {
                    open.pop();
                }
                TEXT_TAG => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text && let Some(&index) = open.last() {
                    paragraphs[index].push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if in_text && let Some(&index) = open.last() {
                    paragraphs[index].push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(anyhow!("failed to parse {}: {}", DOCUMENT_PART, err)),
        }
        buf.clear();
    }
    Ok(paragraphs)
}

/// Writes each replacement into the first `w:t` of its paragraph and empties
/// the paragraph's other `w:t` runs. A replaced paragraph without any `w:t`
/// gets a new plain run.
fn rewrite_paragraphs(xml: &[u8], replacements: &[Option<&str>]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    let mut written = vec![false; replacements.len()];
    let mut open: Vec<usize> = Vec::new();
    let mut next_paragraph = 0usize;
    let mut in_text = false;
    let mut text_slot: Option<usize> = None;

    let replacement = |index: usize| replacements.get(index).copied().flatten();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if name.as_ref() == PARAGRAPH_TAG {
                    open.push(next_paragraph);
                    next_paragraph += 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else if name.as_ref() == TEXT_TAG {
                    in_text = true;
                    text_slot = open
                        .last()
                        .copied()
                        .filter(|&index| replacement(index).is_some());
                    match text_slot {
                        Some(index) if !written[index] => {
                            writer.write_event(Event::Start(preserve_space(&e)?))?;
                        }
                        _ => writer.write_event(Event::Start(e.to_owned()))?,
                    }
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == PARAGRAPH_TAG {
                    let index = next_paragraph;
                    next_paragraph += 1;
                    if let Some(text) = replacement(index) {
                        writer.write_event(Event::Start(e.to_owned()))?;
                        write_run(&mut writer, text)?;
                        writer.write_event(Event::End(BytesEnd::new("w:p")))?;
                        written[index] = true;
                        buf.clear();
                        continue;
                    }
                }
                writer.write_event(Event::Empty(e))?;
            }
            Ok(Event::Text(e)) => match text_slot {
                Some(index) if in_text => {
                    if !written[index] {
                        if let Some(text) = replacement(index) {
                            writer.write_event(Event::Text(BytesText::new(text)))?;
                        }
                        written[index] = true;
                    }
                }
                _ => writer.write_event(Event::Text(e))?,
            },
            Ok(Event::CData(e)) => match text_slot {
                Some(index) if in_text => {
                    if !written[index] {
                        if let Some(text) = replacement(index) {
                            writer.write_event(Event::Text(BytesText::new(text)))?;
                        }
                        written[index] = true;
                    }
                }
                _ => writer.write_event(Event::CData(e))?,
            },
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == TEXT_TAG {
                    if let Some(index) = text_slot.take()
                        && !written[index]
                    {
                        if let Some(text) = replacement(index) {
                            writer.write_event(Event::Text(BytesText::new(text)))?;
                        }
                        written[index] = true;
                    }
                    in_text = false;
                } else if name.as_ref() == PARAGRAPH_TAG
                    && let Some(index) = open.pop()
                    && !written[index]
                    && let Some(text) = replacement(index)
                {
                    write_run(&mut writer, text)?;
                    written[index] = true;
                }
                writer.write_event(Event::End(e.to_owned()))?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(err) => return Err(anyhow!("failed to parse {}: {}", DOCUMENT_PART, err)),
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

fn preserve_space(start: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let mut owned = start.to_owned();
    if start.try_get_attribute("xml:space")?.is_none() {
        owned.push_attribute(("xml:space", "preserve"));
    }
    Ok(owned)
}

fn write_run(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    let mut text_start = BytesStart::new("w:t");
    text_start.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    writer.write_event(Event::Start(text_start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{build_docx, build_docx_with_body, read_zip_entry};

    fn texts(document: &DocxDocument) -> Vec<String> {
        document
            .paragraphs()
            .map(|(_, text)| text.to_string())
            .collect()
    }

    #[test]
    fn extracts_paragraphs_in_order() {
        let bytes = build_docx(&["Hello world", "", "Goodbye"]);
        let document = DocxDocument::open(&bytes).expect("open docx");
        assert_eq!(document.len(), 3);
        assert_eq!(texts(&document), vec!["Hello world", "", "Goodbye"]);
    }

    #[test]
    fn joins_runs_and_includes_table_paragraphs() {
        let body = concat!(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hel</w:t></w:r><w:r><w:t>lo &amp; bye</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr></w:p>",
        );
        let bytes = build_docx_with_body(body);
        let document = DocxDocument::open(&bytes).expect("open docx");
        assert_eq!(texts(&document), vec!["Hello & bye", "Cell", ""]);
    }

    #[test]
    fn replace_writes_first_run_and_clears_the_rest() {
        let body = "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hel</w:t></w:r><w:r><w:t>lo</w:t></w:r></w:p><w:p><w:r><w:t>Keep</w:t></w:r></w:p>";
        let bytes = build_docx_with_body(body);
        let mut document = DocxDocument::open(&bytes).expect("open docx");
        let (first, _) = document.paragraphs().next().expect("paragraph");
        document.replace(first, " Hola <mundo> ");
        assert_eq!(document.text(first), Some(" Hola <mundo> "));

        let output = document.to_bytes().expect("serialize");
        let reopened = DocxDocument::open(&output).expect("reopen");
        assert_eq!(texts(&reopened), vec![" Hola <mundo> ", "Keep"]);

        let xml = read_zip_entry(&output, DOCUMENT_PART);
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains("<w:t xml:space=\"preserve\"> Hola &lt;mundo&gt; </w:t>"));
        assert!(xml.contains("<w:t></w:t>"));
    }

    #[test]
    fn replace_fills_paragraphs_without_runs() {
        let body = "<w:p/><w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr></w:p>";
        let bytes = build_docx_with_body(body);
        let mut document = DocxDocument::open(&bytes).expect("open docx");
        let handles = document
            .paragraphs()
            .map(|(handle, _)| handle)
            .collect::<Vec<_>>();
        document.replace(handles[0], "uno");
        document.replace(handles[1], "dos");

        let output = document.to_bytes().expect("serialize");
        let reopened = DocxDocument::open(&output).expect("reopen");
        assert_eq!(texts(&reopened), vec!["uno", "dos"]);
        let xml = read_zip_entry(&output, DOCUMENT_PART);
        assert!(xml.contains("<w:jc w:val=\"center\"/>"));
    }

    #[test]
    fn untouched_document_round_trips_entries() {
        let bytes = build_docx(&["Hello world", "", "Goodbye"]);
        let document = DocxDocument::open(&bytes).expect("open docx");
        let output = document.to_bytes().expect("serialize");
        assert_eq!(
            read_zip_entry(&output, DOCUMENT_PART),
            read_zip_entry(&bytes, DOCUMENT_PART)
        );
        assert_eq!(
            read_zip_entry(&output, "[Content_Types].xml"),
            read_zip_entry(&bytes, "[Content_Types].xml")
        );
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = DocxDocument::open(b"plain text, not a document").expect_err("invalid");
        assert!(matches!(
            err,
            DocumentError::Parse {
                kind: DocumentKind::Docx,
                ..
            }
        ));
    }

    #[test]
    fn rejects_zip_without_document_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("hello.txt", FileOptions::default())
            .expect("start");
        writer.write_all(b"hi").expect("write");
        let bytes = writer.finish().expect("finish").into_inner();

        let err = DocxDocument::open(&bytes).expect_err("missing part");
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn rejects_malformed_document_xml() {
        let bytes = build_docx_with_body("<w:p><w:r><w:t>broken</w:r></w:p>");
        let err = DocxDocument::open(&bytes).expect_err("malformed xml");
        assert!(matches!(err, DocumentError::Parse { .. }));
    }
}
