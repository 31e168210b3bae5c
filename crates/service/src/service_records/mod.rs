//! Service record persistence: the `serviceEntries` collection and the
//! photos attached to each entry.

use async_trait::async_trait;
use models::image::ImageFile;
use models::service_record::{NewServiceRecord, ServiceRecord, ServiceRecordFields};

use crate::errors::ServiceError;

pub mod repository;

pub use repository::DocumentServiceRecordRepository;

pub const COLLECTION: &str = "serviceEntries";

/// Folder receiving the photos of one vehicle's service records.
pub fn image_folder(car_id: &str) -> String {
    format!("services/{car_id}")
}

/// Result of detaching one photo from a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRemoval {
    pub id: String,
    pub remaining_image_urls: Vec<String>,
}

#[async_trait]
pub trait ServiceRecordRepository: Send + Sync {
    /// Records of one vehicle, newest service date first.
    async fn list_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<ServiceRecord>, ServiceError>;
    async fn get_by_id(&self, id: &str) -> Result<ServiceRecord, ServiceError>;
    async fn create(&self, input: NewServiceRecord, files: Vec<ImageFile>) -> Result<ServiceRecord, ServiceError>;
    /// New photos are appended to the existing ones.
    async fn update(&self, id: &str, input: ServiceRecordFields, files: Vec<ImageFile>) -> Result<ServiceRecord, ServiceError>;
    async fn delete(&self, id: &str) -> Result<String, ServiceError>;
    async fn remove_image(&self, id: &str, url: &str) -> Result<ImageRemoval, ServiceError>;
}
