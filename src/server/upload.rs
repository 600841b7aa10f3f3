use axum::extract::Multipart;

use super::translate::ServerError;

/// A file field from the upload form.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    /// Client filename with any directory part removed. May be empty.
    pub(crate) filename: String,
    pub(crate) data: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub(crate) file: Option<UploadedFile>,
    pub(crate) language: Option<String>,
}

/// Reads the `file` and `language` fields. A `file` field sent without a
/// filename is not treated as a file. Unknown fields are drained and ignored.
pub(crate) async fn parse_upload(mut multipart: Multipart) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ServerError::from_multipart)?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" if form.file.is_none() && field.file_name().is_some() => {
                let filename = base_filename(field.file_name().unwrap_or(""));
                let data = field
                    .bytes()
                    .await
                    .map_err(ServerError::from_multipart)?
                    .to_vec();
                form.file = Some(UploadedFile { filename, data });
            }
            "language" if form.language.is_none() => {
                let value = field.text().await.map_err(ServerError::from_multipart)?;
                form.language = Some(value);
            }
            _ => {
                field.bytes().await.map_err(ServerError::from_multipart)?;
            }
        }
    }

    Ok(form)
}

/// Strips directory components some browsers send along with the name.
pub(crate) fn base_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}
