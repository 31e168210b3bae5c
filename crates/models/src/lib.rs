//! Record types shared by the repositories and hooks.
//! - `vehicle` / `service_record`: stored records and their submission inputs.
//! - `document`: the raw shape exchanged with the document store.
//! - `dates`: normalization of remote date representations.

pub mod dates;
pub mod document;
pub mod errors;
pub mod image;
pub mod serde_helpers;
pub mod service_record;
pub mod vehicle;
