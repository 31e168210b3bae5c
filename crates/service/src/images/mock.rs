//! In-memory image host for tests and doc examples.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use models::image::ImageFile;

use super::{ImageHost, UPLOAD_FAILED};
use crate::errors::ServiceError;

#[derive(Default)]
struct Calls {
    uploads: Vec<(String, String)>, // (folder, url)
    deletions: Vec<String>,
}

/// Records every call; can be told to fail the N-th upload (1-based).
pub struct MockImageHost {
    calls: Mutex<Calls>,
    attempts: AtomicUsize,
    fail_at: AtomicUsize,
    delete_ok: AtomicBool,
}

impl Default for MockImageHost {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Calls::default()),
            attempts: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(0),
            delete_ok: AtomicBool::new(true),
        }
    }
}

impl MockImageHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th upload attempt counted from now; `0` disables.
    pub fn fail_upload_at(&self, n: usize) {
        let base = self.attempts.load(Ordering::SeqCst);
        self.fail_at.store(if n == 0 { 0 } else { base + n }, Ordering::SeqCst);
    }

    pub fn set_delete_result(&self, ok: bool) {
        self.delete_ok.store(ok, Ordering::SeqCst);
    }

    fn calls(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// URLs of successful uploads, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.calls().uploads.iter().map(|(_, url)| url.clone()).collect()
    }

    pub fn folders(&self) -> Vec<String> {
        self.calls().uploads.iter().map(|(folder, _)| folder.clone()).collect()
    }

    /// URLs passed to `delete`, in order, whatever the outcome.
    pub fn deleted(&self) -> Vec<String> {
        self.calls().deletions.clone()
    }
}

#[async_trait]
impl ImageHost for MockImageHost {
    async fn upload(&self, file: &ImageFile, folder: &str) -> Result<String, ServiceError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_at.load(Ordering::SeqCst) {
            return Err(ServiceError::Upload(UPLOAD_FAILED.to_string()));
        }
        let url = format!("https://images.test/{folder}/{attempt}-{}", file.file_name);
        self.calls().uploads.push((folder.to_string(), url.clone()));
        Ok(url)
    }

    async fn delete(&self, url: &str) -> bool {
        self.calls().deletions.push(url.to_string());
        self.delete_ok.load(Ordering::SeqCst)
    }
}
