use tracing::info;

use crate::documents::docx::DocxDocument;
use crate::documents::pdf::{self, PdfLayout};
use crate::documents::{DocumentError, DocumentKind};
use crate::languages::TargetLanguage;
use crate::providers::Provider;
use crate::translator::{TranslationOutcome, Translator};

/// Separator appended after every translated PDF page.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct DocumentTranslation {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    /// Text units sent to the translator.
    pub units: usize,
    /// Units that kept their original text because translation failed.
    pub fallbacks: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct UnitTally {
    units: usize,
    fallbacks: usize,
}

impl UnitTally {
    fn record(&mut self, outcome: &TranslationOutcome) {
        self.units += 1;
        if outcome.is_fallback() {
            self.fallbacks += 1;
        }
    }

    fn finish(self, kind: DocumentKind, bytes: Vec<u8>) -> DocumentTranslation {
        info!(
            "{}: translated {} unit(s), {} kept original text",
            kind,
            self.units - self.fallbacks,
            self.fallbacks
        );
        DocumentTranslation {
            bytes,
            mime: kind.mime(),
            units: self.units,
            fallbacks: self.fallbacks,
        }
    }
}

/// Extract, translate and rebuild a document. Units are translated one at a
/// time in document order.
#[derive(Debug, Clone)]
pub struct Pipeline<P: Provider> {
    translator: Translator<P>,
    pdf_layout: PdfLayout,
}

impl<P: Provider> Pipeline<P> {
    pub fn new(translator: Translator<P>, pdf_layout: PdfLayout) -> Self {
        Self {
            translator,
            pdf_layout,
        }
    }

    pub fn translator(&self) -> &Translator<P> {
        &self.translator
    }

    pub async fn translate_document(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
        target: TargetLanguage,
    ) -> Result<DocumentTranslation, DocumentError> {
        match kind {
            DocumentKind::Docx => self.translate_docx(bytes, target).await,
            DocumentKind::Pdf => self.translate_pdf(bytes, target).await,
        }
    }

    /// Translates every non-blank paragraph in place. Blank paragraphs and
    /// paragraphs whose translation failed are left untouched.
    pub async fn translate_docx(
        &self,
        bytes: &[u8],
        target: TargetLanguage,
    ) -> Result<DocumentTranslation, DocumentError> {
        let mut document = DocxDocument::open(bytes)?;
        let units = document
            .paragraphs()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(handle, text)| (handle, text.to_string()))
            .collect::<Vec<_>>();
        info!(
            "docx: {} paragraph(s), {} with text",
            document.len(),
            units.len()
        );

        let mut tally = UnitTally::default();
        for (handle, text) in units {
            let outcome = self.translator.translate(&text, target).await;
            tally.record(&outcome);
            if let TranslationOutcome::Translated(translated) = outcome {
                document.replace(handle, translated);
            }
        }

        let bytes = document.to_bytes()?;
        Ok(tally.finish(DocumentKind::Docx, bytes))
    }

    /// Translates each page as one unit and flattens the result onto a single
    /// page sized like the first source page.
    pub async fn translate_pdf(
        &self,
        bytes: &[u8],
        target: TargetLanguage,
    ) -> Result<DocumentTranslation, DocumentError> {
        let source = pdf::extract(bytes)?;
        info!(
            "pdf: {} page(s), first page {:.0}x{:.0}pt",
            source.pages.len(),
            source.width,
            source.height
        );
        let (text, tally) = self.translate_pages(&source.pages, target).await;
        let bytes =
            pdf::build_translated_document(&text, source.width, source.height, &self.pdf_layout)?;
        Ok(tally.finish(DocumentKind::Pdf, bytes))
    }

    async fn translate_pages(&self, pages: &[String], target: TargetLanguage) -> (String, UnitTally) {
        let mut tally = UnitTally::default();
        let mut accumulated = String::new();
        for page in pages {
            if page.trim().is_empty() {
                accumulated.push_str(page);
            } else {
                let outcome = self.translator.translate(page, target).await;
                tally.record(&outcome);
                accumulated.push_str(outcome.text());
            }
            accumulated.push_str(PAGE_SEPARATOR);
        }
        (accumulated, tally)
    }
}
