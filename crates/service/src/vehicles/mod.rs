//! Vehicle persistence: the `cars` collection plus each vehicle's photo.

use async_trait::async_trait;
use models::image::ImageFile;
use models::vehicle::{Vehicle, VehicleFields};

use crate::errors::ServiceError;

pub mod repository;

pub use repository::DocumentVehicleRepository;

pub const COLLECTION: &str = "cars";
pub const IMAGE_FOLDER: &str = "cars";

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// All vehicles, ascending by name (byte-wise, so upper case sorts first).
    async fn list(&self) -> Result<Vec<Vehicle>, ServiceError>;
    async fn get_by_id(&self, id: &str) -> Result<Vehicle, ServiceError>;
    async fn create(&self, input: VehicleFields, image: Option<ImageFile>) -> Result<Vehicle, ServiceError>;
    async fn update(&self, id: &str, input: VehicleFields, image: Option<ImageFile>) -> Result<Vehicle, ServiceError>;
    /// Returns the removed identifier.
    async fn delete(&self, id: &str) -> Result<String, ServiceError>;
}
