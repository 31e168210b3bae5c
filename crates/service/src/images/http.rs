use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use configs::ImageHostConfig;
use models::image::ImageFile;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use super::{ImageHost, UPLOAD_FAILED};
use crate::errors::ServiceError;

/// Cloudinary-style image host over HTTP: unsigned preset uploads and,
/// when enabled, signed destroy calls.
pub struct HttpImageHost {
    client: reqwest::Client,
    cfg: ImageHostConfig,
}

impl HttpImageHost {
    pub fn new(cfg: ImageHostConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(cfg.timeout_secs)).build()?;
        Ok(Self { client, cfg })
    }

    pub fn config(&self) -> &ImageHostConfig {
        &self.cfg
    }

    /// Blank folders land in the configured default folder.
    fn target_folder<'a>(&'a self, folder: &'a str) -> &'a str {
        if folder.trim().is_empty() { &self.cfg.default_folder } else { folder }
    }

    fn file_part(file: &ImageFile) -> Part {
        let part = || Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        match file.content_type.as_deref() {
            Some(ct) => part().mime_str(ct).unwrap_or_else(|_| part()),
            None => part(),
        }
    }

    async fn destroy(&self, public_id: &str) -> Result<bool, String> {
        let (Some(key), Some(secret)) = (self.cfg.api_key.as_deref(), self.cfg.api_secret.as_deref()) else {
            return Err("api credentials missing".to_string());
        };
        let timestamp = Utc::now().timestamp();
        let form = Form::new()
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp.to_string())
            .text("api_key", key.to_string())
            .text("signature", sign(public_id, timestamp, secret))
            .text("signature_algorithm", "sha256");
        let resp = self
            .client
            .post(self.cfg.destroy_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        let body: Value = resp.json().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(upload_error_message(&body));
        }
        Ok(body.get("result").and_then(Value::as_str) == Some("ok"))
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    #[instrument(skip(self, file), fields(file = %file.file_name, size = file.bytes.len()))]
    async fn upload(&self, file: &ImageFile, folder: &str) -> Result<String, ServiceError> {
        let folder = self.target_folder(folder);
        debug!(folder = %folder, "uploading image");
        let form = Form::new()
            .part("file", Self::file_part(file))
            .text("upload_preset", self.cfg.upload_preset.clone())
            .text("folder", folder.to_string());

        let resp = self
            .client
            .post(self.cfg.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Upload(e.to_string()))?;
        let status = resp.status();
        // error bodies are not always JSON; treat unreadable ones as empty
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = upload_error_message(&body);
            warn!(status = %status, error = %message, "image upload rejected");
            return Err(ServiceError::Upload(message));
        }
        match body.get("secure_url").and_then(Value::as_str) {
            Some(url) => {
                info!(url = %url, "image uploaded");
                Ok(url.to_string())
            }
            None => Err(ServiceError::Upload(UPLOAD_FAILED.to_string())),
        }
    }

    async fn delete(&self, url: &str) -> bool {
        if !self.cfg.deletion_enabled {
            warn!(url = %url, "image deletion not supported on this plan; skipping");
            return true;
        }
        let Some(public_id) = public_id_from_url(url) else {
            warn!(url = %url, "cannot derive public id; image not deleted");
            return false;
        };
        match self.destroy(&public_id).await {
            Ok(ok) => {
                debug!(public_id = %public_id, ok, "image destroy answered");
                ok
            }
            Err(e) => {
                warn!(public_id = %public_id, error = %e, "image destroy failed");
                false
            }
        }
    }
}

/// `error.message` from a host error body, or the generic upload failure.
pub fn upload_error_message(body: &Value) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(UPLOAD_FAILED)
        .to_string()
}

/// Public id of a delivery URL: the path after `/upload/` without the
/// `v<digits>` version segment and without the file extension.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, path) = url.split_once("/upload/")?;
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .first()
        .is_some_and(|s| s.len() > 1 && s.starts_with('v') && s[1..].bytes().all(|b| b.is_ascii_digit()))
    {
        segments.remove(0);
    }
    let last = segments.pop()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    if stem.is_empty() {
        return None;
    }
    segments.push(stem);
    Some(segments.join("/"))
}

/// Hex SHA-256 over the sorted signed parameters followed by the secret.
pub fn sign(public_id: &str, timestamp: i64, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("public_id={public_id}&timestamp={timestamp}{secret}").as_bytes());
    hex::encode(hasher.finalize())
}
