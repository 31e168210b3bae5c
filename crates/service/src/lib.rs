//! Data-access layer of the car maintenance tracker.
//! - `vehicles` / `service_records`: repositories over a document store and an image host.
//! - `hooks`: cached collections with loading and error state for callers.
//! - `storage` / `images`: the two remote dependencies and their local stand-ins.
//! - Errors surface as `ServiceError` with stable codes.

pub mod errors;
pub mod hooks;
pub mod images;
pub mod runtime;
pub mod service_records;
pub mod storage;
#[cfg(test)]
pub mod test_support;
pub mod vehicles;
