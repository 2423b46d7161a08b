//! 画像アップロードの入力と事前検証

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;

/// アップロード可能な最大サイズ（5 MiB、境界値を含む）
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// アップロードする画像ファイル
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

// バイト列はログに出さない
impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// ファイル名・サイズ・MIME タイプを検証する
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_file_name(&self.file_name) {
            return Err(ValidationError::InvalidFileName(self.file_name.clone()));
        }

        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::FileTooLarge {
                size: self.bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        if !self.mime_type.starts_with("image/") {
            return Err(ValidationError::UnsupportedMediaType(self.mime_type.clone()));
        }

        Ok(())
    }
}

/// `^[a-zA-Z0-9._-]+$` 相当（ASCII のみ）
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// アップロード済み画像の URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}
