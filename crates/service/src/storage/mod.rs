//! Storage abstractions for the repositories
//!
//! `JsonMapStore` persists one map per file; `DocumentStore` layers named
//! collections, generated ids and simple queries on top of it.

use thiserror::Error;

pub mod document_store;
pub mod json_map_store;
pub mod mock;

pub use document_store::{Direction, DocumentStore, JsonDocumentStore, Query};
pub use json_map_store::JsonMapStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: String, reason: String },
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("document {0} does not exist")]
    Missing(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Current time, both typed and as the value written to `createdAt`/`updatedAt`.
pub fn timestamp_now() -> (chrono::DateTime<chrono::Utc>, serde_json::Value) {
    let now = chrono::Utc::now();
    (now, serde_json::Value::String(now.to_rfc3339()))
}
