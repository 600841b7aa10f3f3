use axum::extract::multipart::MultipartError;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use super::upload::UploadForm;
use crate::documents::{DocumentError, DocumentKind};
use crate::languages::TargetLanguage;
use crate::pipeline::{DocumentTranslation, Pipeline};
use crate::providers::Provider;

pub(crate) const NO_FILE_PART: &str = "No file part";
pub(crate) const INVALID_FILE: &str = "Invalid file type or no file selected";
pub(crate) const INVALID_LANGUAGE: &str = "Invalid target language";

/// Prefix of the downloaded file name.
const OUTPUT_PREFIX: &str = "translated_";

/// Handler failure, rendered as a plain-text body with `status`.
#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub(crate) fn from_multipart(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

impl From<DocumentError> for ServerError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Parse { message, .. } => {
                ServerError::bad_request(format!("Could not read document: {}", message))
            }
            err @ DocumentError::Write { .. } => ServerError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("request failed: {}", self.message);
        } else {
            warn!("request rejected ({}): {}", self.status.as_u16(), self.message);
        }
        (self.status, self.message).into_response()
    }
}

/// Validates the form, runs the pipeline and builds the attachment response.
pub(crate) async fn translate_upload<P: Provider>(
    pipeline: &Pipeline<P>,
    form: UploadForm,
) -> Result<Response, ServerError> {
    let file = form
        .file
        .ok_or_else(|| ServerError::bad_request(NO_FILE_PART))?;
    let kind = DocumentKind::from_filename(&file.filename)
        .ok_or_else(|| ServerError::bad_request(INVALID_FILE))?;
    let target = form
        .language
        .as_deref()
        .and_then(TargetLanguage::from_code)
        .ok_or_else(|| ServerError::bad_request(INVALID_LANGUAGE))?;

    info!(
        "translating {} ({}, {} bytes) to {}",
        file.filename,
        kind,
        file.data.len(),
        target
    );
    let translation = pipeline
        .translate_document(kind, &file.data, target)
        .await?;
    attachment_response(&file.filename, translation)
}

fn attachment_response(
    filename: &str,
    translation: DocumentTranslation,
) -> Result<Response, ServerError> {
    let disposition = content_disposition(&format!("{}{}", OUTPUT_PREFIX, filename));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|err| ServerError::internal(format!("invalid content disposition: {}", err)))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(translation.mime)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        translation.bytes,
    )
        .into_response())
}

/// `attachment` disposition. Names that are not plain printable ASCII get an
/// ASCII fallback plus an RFC 5987 `filename*`.
pub(crate) fn content_disposition(filename: &str) -> String {
    let fallback = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    if fallback == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(filename)
    )
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
