//! Remote image hosting.
//!
//! Uploads are authoritative: a failed upload fails the enclosing mutation.
//! Deletions are advisory: [`ImageHost::delete`] reports a boolean and never
//! errors, so a failed cleanup cannot block a write.

use async_trait::async_trait;
use common::utils::validators::validate_file_size;
use models::image::ImageFile;
use tracing::warn;

use crate::errors::ServiceError;

pub mod http;
pub mod mock;

pub use http::HttpImageHost;

/// Message used when the host gives no reason for a failed upload.
pub const UPLOAD_FAILED: &str = "Failed to upload image";

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload into `folder` and return the public URL.
    async fn upload(&self, file: &ImageFile, folder: &str) -> Result<String, ServiceError>;

    /// Remove a previously uploaded image. `true` when the host accepted (or
    /// deletion is a no-op for this account).
    async fn delete(&self, url: &str) -> bool;
}

/// Delete each URL in turn, logging failures instead of returning them.
pub async fn delete_best_effort<H: ImageHost + ?Sized>(host: &H, urls: &[String]) -> usize {
    let mut failed = 0;
    for url in urls {
        if !host.delete(url).await {
            failed += 1;
            warn!(url = %url, "image cleanup failed; remote file left behind");
        }
    }
    failed
}

/// Upload `files` one after another into `folder`.
///
/// On the first failure, images already uploaded by this call are cleaned up
/// when `rollback` is set, and the upload error is returned.
pub async fn upload_all<H: ImageHost + ?Sized>(
    host: &H,
    files: &[ImageFile],
    folder: &str,
    rollback: bool,
) -> Result<Vec<String>, ServiceError> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        match host.upload(file, folder).await {
            Ok(url) => urls.push(url),
            Err(e) => {
                warn!(file = %file.file_name, uploaded = urls.len(), error = %e, "upload failed");
                if rollback {
                    delete_best_effort(host, &urls).await;
                }
                return Err(e);
            }
        }
    }
    Ok(urls)
}

/// Client-side limits checked before an upload is attempted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageRules {
    pub max_size_mb: Option<f64>,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            max_size_mb: Some(common::utils::validators::DEFAULT_MAX_FILE_SIZE_MB),
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
        }
    }
}

/// Validate type, size and dimensions. `None` when the file is acceptable.
pub fn validate_image(file: &ImageFile, rules: ImageRules) -> Option<String> {
    if !file.is_image() {
        return Some("File must be an image".to_string());
    }
    if let Some(max) = rules.max_size_mb {
        if let Some(msg) = validate_file_size(file.size(), max) {
            return Some(msg);
        }
    }
    let decoded = match image::load_from_memory(&file.bytes) {
        Ok(img) => img,
        Err(_) => return Some("Failed to load image".to_string()),
    };
    let (width, height) = (decoded.width(), decoded.height());
    if let Some(min) = rules.min_width.filter(|min| width < *min) {
        return Some(format!("Image width must be at least {min}px"));
    }
    if let Some(min) = rules.min_height.filter(|min| height < *min) {
        return Some(format!("Image height must be at least {min}px"));
    }
    if let Some(max) = rules.max_width.filter(|max| width > *max) {
        return Some(format!("Image width must be at most {max}px"));
    }
    if let Some(max) = rules.max_height.filter(|max| height > *max) {
        return Some(format!("Image height must be at most {max}px"));
    }
    None
}
