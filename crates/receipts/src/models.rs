use crate::service::ReceiptError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn from_extension(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }

    // Magic numbers, so a renamed file is caught before it is stored.
    fn matches(self, bytes: &[u8]) -> bool {
        match self {
            ImageKind::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageKind::Png => bytes.starts_with(&[0x89, b'P', b'N', b'G']),
            ImageKind::Webp => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptRef(pub Uuid);

impl ReceiptRef {
    pub fn generate() -> Self {
        ReceiptRef(Uuid::new_v4())
    }
}

impl fmt::Display for ReceiptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An image the user wants to attach, before it reaches the store.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptUpload {
    /// Infers the content type from the file extension.
    pub fn from_file(file_name: &str, bytes: Vec<u8>) -> Self {
        let content_type = ImageKind::from_extension(file_name)
            .map(|k| k.content_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self {
            file_name: file_name.to_string(),
            content_type,
            bytes,
        }
    }

    pub fn validate(&self) -> Result<ImageKind, ReceiptError> {
        let kind = ImageKind::from_content_type(&self.content_type)
            .ok_or_else(|| ReceiptError::UnsupportedType(self.content_type.clone()))?;

        if self.bytes.is_empty() {
            return Err(ReceiptError::Empty);
        }
        if self.bytes.len() > MAX_RECEIPT_BYTES {
            return Err(ReceiptError::TooLarge { size: self.bytes.len(), max: MAX_RECEIPT_BYTES });
        }
        if !kind.matches(&self.bytes) {
            return Err(ReceiptError::UnsupportedType(format!(
                "{} (content does not match)",
                self.content_type
            )));
        }

        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptRef,
    pub file_name: String,
    pub kind: ImageKind,
    pub size: usize,
    pub data: String, // base64
    pub uploaded_at: DateTime<Utc>,
}

impl Receipt {
    pub fn new(upload: &ReceiptUpload, kind: ImageKind, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id: ReceiptRef::generate(),
            file_name: upload.file_name.clone(),
            kind,
            size: upload.bytes.len(),
            data: STANDARD.encode(&upload.bytes),
            uploaded_at,
        }
    }

    pub fn bytes(&self) -> Result<Vec<u8>, ReceiptError> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| ReceiptError::Storage(format!("corrupt receipt {}: {}", self.id, e)))
    }
}
