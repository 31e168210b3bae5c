use std::sync::Arc;

use async_trait::async_trait;
use configs::PolicyConfig;
use models::document::{encode, Document};
use models::image::ImageFile;
use models::service_record::ServiceRecord;
use models::vehicle::{Vehicle, VehicleFields};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{VehicleRepository, COLLECTION, IMAGE_FOLDER};
use crate::errors::ServiceError;
use crate::images::{delete_best_effort, ImageHost};
use crate::service_records;
use crate::storage::{timestamp_now, Direction, DocumentStore, Query, StoreError};

/// Vehicle repository over a document store and an image host.
pub struct DocumentVehicleRepository<S: DocumentStore, H: ImageHost> {
    store: Arc<S>,
    images: Arc<H>,
    policy: PolicyConfig,
}

impl<S: DocumentStore, H: ImageHost> DocumentVehicleRepository<S, H> {
    pub fn new(store: Arc<S>, images: Arc<H>, policy: PolicyConfig) -> Self {
        Self { store, images, policy }
    }

    fn decode(doc: &Document) -> Result<Vehicle, ServiceError> {
        Ok(doc.decode::<Vehicle>()?)
    }

    async fn rollback(&self, url: Option<String>) {
        if let (true, Some(url)) = (self.policy.rollback_partial_uploads, url) {
            delete_best_effort(self.images.as_ref(), &[url]).await;
        }
    }

    /// Remove every service record of `vehicle_id` together with its images.
    async fn cascade(&self, vehicle_id: &str) -> Result<usize, ServiceError> {
        let query = Query::new().where_eq("carId", vehicle_id);
        let docs = self
            .store
            .query(service_records::COLLECTION, &query)
            .await
            .map_err(ServiceError::query)?;
        for doc in &docs {
            match doc.decode::<ServiceRecord>() {
                Ok(record) => {
                    delete_best_effort(self.images.as_ref(), &record.image_urls).await;
                }
                Err(e) => warn!(record_id = %doc.id, error = %e, "undecodable service record; images kept"),
            }
            self.store
                .delete(service_records::COLLECTION, &doc.id)
                .await
                .map_err(ServiceError::write)?;
        }
        Ok(docs.len())
    }
}

fn not_found() -> ServiceError {
    ServiceError::not_found("Car")
}

fn write_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::Missing(_) => not_found(),
        other => ServiceError::write(other),
    }
}

#[async_trait]
impl<S: DocumentStore, H: ImageHost> VehicleRepository for DocumentVehicleRepository<S, H> {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Vehicle>, ServiceError> {
        let query = Query::new().order_by("name", Direction::Ascending);
        let docs = self.store.query(COLLECTION, &query).await.map_err(ServiceError::query)?;
        let vehicles: Vec<Vehicle> = docs
            .iter()
            .filter_map(|doc| match Self::decode(doc) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "skipping malformed vehicle");
                    None
                }
            })
            .collect();
        debug!(count = vehicles.len(), "vehicles listed");
        Ok(vehicles)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Vehicle, ServiceError> {
        let doc = self
            .store
            .get(COLLECTION, id)
            .await
            .map_err(ServiceError::query)?
            .ok_or_else(not_found)?;
        Self::decode(&doc)
    }

    /// Upload first, then write. A failed upload writes nothing.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::images::mock::MockImageHost;
    /// use service::storage::JsonDocumentStore;
    /// use service::vehicles::{DocumentVehicleRepository, VehicleRepository};
    /// use models::image::ImageFile;
    /// use models::vehicle::VehicleFields;
    ///
    /// let repo = DocumentVehicleRepository::new(
    ///     Arc::new(JsonDocumentStore::in_memory()),
    ///     Arc::new(MockImageHost::new()),
    ///     Default::default(),
    /// );
    /// let photo = ImageFile::new("civic.jpg", vec![0xFF, 0xD8]);
    /// let civic = tokio_test::block_on(repo.create(VehicleFields::new("Civic", "EK4"), Some(photo))).unwrap();
    /// assert!(!civic.id.is_empty());
    /// assert!(civic.image_url.unwrap().contains("/cars/"));
    /// ```
    #[instrument(skip(self, input, image), fields(name = %input.name, has_image = image.is_some()))]
    async fn create(&self, input: VehicleFields, image: Option<ImageFile>) -> Result<Vehicle, ServiceError> {
        let image_url = match &image {
            Some(file) => Some(self.images.upload(file, IMAGE_FOLDER).await?),
            None => None,
        };

        let (_, now) = timestamp_now();
        let mut data = encode(&input.normalized())?;
        data.insert("imageUrl".into(), image_url.clone().map_or(Value::Null, Value::String));
        data.insert("createdAt".into(), now);

        let id = match self.store.add(COLLECTION, data.clone()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "vehicle write failed after upload");
                self.rollback(image_url).await;
                return Err(ServiceError::write(e));
            }
        };
        info!(vehicle_id = %id, "vehicle_created");
        Self::decode(&Document::new(id, data))
    }

    /// Replaces the photo upload-then-delete: the old image is removed only
    /// after the new URL has been written.
    #[instrument(skip(self, input, image), fields(has_image = image.is_some()))]
    async fn update(&self, id: &str, input: VehicleFields, image: Option<ImageFile>) -> Result<Vehicle, ServiceError> {
        let mut vehicle = self.get_by_id(id).await?;
        let new_url = match &image {
            Some(file) => Some(self.images.upload(file, IMAGE_FOLDER).await?),
            None => None,
        };

        let input = input.normalized();
        let (updated_at, now) = timestamp_now();
        let mut patch = encode(&input)?;
        if let Some(url) = &new_url {
            patch.insert("imageUrl".into(), Value::String(url.clone()));
        }
        patch.insert("updatedAt".into(), now);

        if let Err(e) = self.store.update(COLLECTION, id, patch).await {
            warn!(error = %e, "vehicle update failed");
            self.rollback(new_url).await;
            return Err(write_error(e));
        }

        if let Some(url) = new_url {
            if let Some(old) = vehicle.image_url.replace(url) {
                delete_best_effort(self.images.as_ref(), &[old]).await;
            }
        }
        vehicle.apply(input);
        vehicle.updated_at = Some(updated_at);
        info!(vehicle_id = %id, "vehicle_updated");
        Ok(vehicle)
    }

    /// Service records are kept unless `policy.cascade_service_records` is set.
    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<String, ServiceError> {
        let vehicle = self.get_by_id(id).await?;
        if self.policy.cascade_service_records {
            let removed = self.cascade(id).await?;
            debug!(vehicle_id = %id, removed, "service records cascaded");
        }
        if let Some(url) = vehicle.image_url {
            delete_best_effort(self.images.as_ref(), &[url]).await;
        }
        self.store.delete(COLLECTION, id).await.map_err(write_error)?;
        info!(vehicle_id = %id, "vehicle_deleted");
        Ok(id.to_string())
    }
}
