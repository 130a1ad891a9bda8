use std::collections::HashMap;

use axum::extract::Multipart;
use serde_json::Value;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Collected multipart form: text fields and file parts, keyed by field name.
/// A trailing `[]` on a field name (array convention used by the web client)
/// is stripped, so `documents[]` and repeated `documents` parts both land
/// under `documents`.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormData {
    pub async fn read(multipart: &mut Multipart) -> AppResult<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(format!("invalid multipart body: {err}")))?
        {
            let name = match field.name() {
                Some(name) => name.trim_end_matches("[]").to_string(),
                None => continue,
            };

            if let Some(file_name) = field.file_name() {
                let original_name = file_name.to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| {
                        AppError::bad_request(format!("failed to read uploaded file: {err}"))
                    })?
                    .to_vec();
                form.files.entry(name).or_default().push(UploadedFile {
                    original_name,
                    content_type,
                    bytes,
                });
            } else {
                let text = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read form field: {err}"))
                })?;
                form.fields.entry(name).or_default().push(text);
            }
        }

        Ok(form)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|files| files.first())
    }

    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parses a text field as JSON. Structured sub-objects (contact lists,
    /// personnel tables) arrive this way inside multipart forms.
    pub fn json_value(&self, name: &str) -> AppResult<Option<Value>> {
        match self.value(name) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|err| AppError::bad_request(format!("field {name} is not valid JSON: {err}"))),
        }
    }
}
