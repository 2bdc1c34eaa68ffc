//! Multipart form reading for image uploads.

use std::collections::HashMap;

use actix_multipart::{Multipart, MultipartError};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;

use crate::errors::{ApiError, ApiResult};

pub const IMAGE_FIELD: &str = "image";
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Text fields are small form values; anything larger is abuse.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn has_filename(&self) -> bool {
        !self.filename.is_empty()
    }

    pub fn has_supported_extension(&self) -> bool {
        has_supported_extension(&self.filename)
    }
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

pub fn has_supported_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn unsupported_type_message() -> String {
    format!(
        "Invalid file type. Supported formats: {}",
        SUPPORTED_EXTENSIONS.join(", ")
    )
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::validation(format!("Invalid multipart body: {err}"))
}

/// Drain a multipart body, keeping text fields and the `image` file.
/// The image is rejected as soon as it grows past `max_image_bytes`.
pub async fn read_form(mut payload: Multipart, max_image_bytes: usize) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let is_image = name == IMAGE_FIELD;
        let limit = if is_image { max_image_bytes } else { MAX_TEXT_FIELD_BYTES };

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if buf.len() + chunk.len() > limit {
                return Err(if is_image {
                    ApiError::PayloadTooLarge(format!(
                        "Image exceeds the {} byte upload limit",
                        max_image_bytes
                    ))
                } else {
                    ApiError::validation(format!("Form field '{name}' is too large"))
                });
            }
            buf.extend_from_slice(&chunk);
        }

        if is_image {
            form.image = Some(ImageUpload {
                filename: disposition.get_filename().unwrap_or_default().to_string(),
                data: buf.freeze(),
            });
        } else {
            let value = String::from_utf8(buf.to_vec())
                .map_err(|_| ApiError::validation(format!("Form field '{name}' is not valid UTF-8")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
