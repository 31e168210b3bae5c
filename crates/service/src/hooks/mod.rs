//! Data-access hooks: cached, observable views over the repositories.
//!
//! A hook owns an ordered copy of one collection, a loading indicator and an
//! error slot. Mutations patch the cache in place instead of refetching.
//! Errors never escape: they are logged, stored as a message and reported
//! through a sentinel (`None` or an unsuccessful [`Outcome`]).

pub mod in_flight;
pub mod service_records;
pub mod vehicle_collection;

pub use in_flight::{InFlight, InFlightGuard};
pub use service_records::ServiceRecordsForVehicle;
pub use vehicle_collection::VehicleCollection;

/// Kinds of calls a hook can have in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
    RemoveImage,
}

/// Result of calls that have no record to hand back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub error: Option<String>,
}

impl Outcome {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

/// Cached collection plus the last error, guarded together.
#[derive(Debug)]
pub(crate) struct Cache<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self { items: Vec::new(), error: None }
    }
}
