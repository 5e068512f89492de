//! Crop image payloads handed to storage and the classifier.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Largest image accepted for analysis (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Image encodings the classifier accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Parses a MIME type; only `image/jpeg` and `image/png` are recognized.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Guesses the format from a file extension (`jpg`, `jpeg`, `png`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// An image selected by the user, held in memory for the whole submission.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Original file name, forwarded to the classifier as the multipart file name.
    pub file_name: String,
    /// Declared MIME type. Validated by the submission pipeline, not here.
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads an image from disk, deriving the MIME type from the extension.
    ///
    /// Unknown extensions get `application/octet-stream` so that the
    /// pipeline's validation, not this loader, rejects them.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let content_type = ImageFormat::from_path(path)
            .map(ImageFormat::mime)
            .unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime(&self.content_type)
    }
}
