pub mod docx;
pub mod pdf;

use std::fmt;
use thiserror::Error;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Resolves the kind from the filename extension (case-insensitive).
    /// Names without a dot or with another extension are rejected.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(DocumentKind::Docx),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            DocumentKind::Docx => DOCX_MIME,
            DocumentKind::Pdf => PDF_MIME,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    /// The uploaded bytes are not a readable document of the expected kind.
    #[error("failed to read {kind} document: {message}")]
    Parse { kind: DocumentKind, message: String },
    #[error("failed to write {kind} document: {message}")]
    Write { kind: DocumentKind, message: String },
}

impl DocumentError {
    pub(crate) fn parse(kind: DocumentKind, err: anyhow::Error) -> Self {
        DocumentError::Parse {
            kind,
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn write(kind: DocumentKind, err: anyhow::Error) -> Self {
        DocumentError::Write {
            kind,
            message: format!("{:#}", err),
        }
    }
}
