//! HTTP handlers, grouped per resource. Each module exposes a `routes()`
//! builder merged into the application router.

pub mod auth;
pub mod blog;
pub mod files;
pub mod orders;
pub mod smartphones;

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::storage::UploadFile;

/// A fully drained multipart request: text fields by name, file parts
/// grouped by field name in arrival order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Vec<UploadFile>>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require_field(&self, name: &str) -> Result<&str, ApiError> {
        self.field(name)
            .ok_or_else(|| ApiError::bad_request(format!("Missing field: {}", name)))
    }

    pub fn files(&self, name: &str) -> &[UploadFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub async fn parse_multipart(mut multipart: Multipart) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }

        match field.file_name().map(String::from) {
            Some(file_name) => {
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
                form.files.entry(name).or_default().push(UploadFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read field: {}", e)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Comma-separated tag field; surrounding whitespace is dropped.
pub(crate) fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_split_on_commas_and_trim() {
        assert_eq!(
            split_tags("rust, async ,web,,"),
            vec!["rust", "async", "web"]
        );
        assert!(split_tags("").is_empty());
    }
}
