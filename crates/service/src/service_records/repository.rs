use std::sync::Arc;

use async_trait::async_trait;
use configs::PolicyConfig;
use models::document::{encode, Document};
use models::image::ImageFile;
use models::service_record::{NewServiceRecord, ServiceRecord, ServiceRecordFields};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{image_folder, ImageRemoval, ServiceRecordRepository, COLLECTION};
use crate::errors::ServiceError;
use crate::images::{delete_best_effort, upload_all, ImageHost};
use crate::storage::{timestamp_now, Direction, DocumentStore, Query, StoreError};

/// Service record repository over a document store and an image host.
pub struct DocumentServiceRecordRepository<S: DocumentStore, H: ImageHost> {
    store: Arc<S>,
    images: Arc<H>,
    policy: PolicyConfig,
}

fn not_found() -> ServiceError {
    ServiceError::not_found("Service entry")
}

fn write_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::Missing(_) => not_found(),
        other => ServiceError::write(other),
    }
}

fn url_list(urls: &[String]) -> Value {
    Value::Array(urls.iter().cloned().map(Value::String).collect())
}

impl<S: DocumentStore, H: ImageHost> DocumentServiceRecordRepository<S, H> {
    pub fn new(store: Arc<S>, images: Arc<H>, policy: PolicyConfig) -> Self {
        Self { store, images, policy }
    }

    async fn rollback(&self, urls: &[String]) {
        if self.policy.rollback_partial_uploads && !urls.is_empty() {
            let failed = delete_best_effort(self.images.as_ref(), urls).await;
            debug!(attempted = urls.len(), failed, "rolled back uploads");
        }
    }

    async fn upload(&self, files: &[ImageFile], car_id: &str) -> Result<Vec<String>, ServiceError> {
        upload_all(self.images.as_ref(), files, &image_folder(car_id), self.policy.rollback_partial_uploads).await
    }
}

#[async_trait]
impl<S: DocumentStore, H: ImageHost> ServiceRecordRepository for DocumentServiceRecordRepository<S, H> {
    #[instrument(skip(self))]
    async fn list_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<ServiceRecord>, ServiceError> {
        let query = Query::new()
            .where_eq("carId", vehicle_id)
            .order_by("date", Direction::Descending);
        let docs = self.store.query(COLLECTION, &query).await.map_err(ServiceError::query)?;
        let mut records: Vec<ServiceRecord> = docs
            .iter()
            .filter_map(|doc| match doc.decode::<ServiceRecord>() {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "skipping malformed service record");
                    None
                }
            })
            .collect();
        // stored dates come in several shapes; order on the normalized value
        records.sort_by(|a, b| b.date.cmp(&a.date));
        debug!(count = records.len(), "service records listed");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<ServiceRecord, ServiceError> {
        let doc = self
            .store
            .get(COLLECTION, id)
            .await
            .map_err(ServiceError::query)?
            .ok_or_else(not_found)?;
        Ok(doc.decode()?)
    }

    #[instrument(skip(self, input, files), fields(car_id = %input.car_id, files = files.len()))]
    async fn create(&self, input: NewServiceRecord, files: Vec<ImageFile>) -> Result<ServiceRecord, ServiceError> {
        let urls = self.upload(&files, &input.car_id).await?;

        let (_, now) = timestamp_now();
        let mut data = encode(&input.normalized())?;
        data.insert("imageUrls".into(), url_list(&urls));
        data.insert("createdAt".into(), now);

        let id = match self.store.add(COLLECTION, data.clone()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, uploaded = urls.len(), "service record write failed");
                self.rollback(&urls).await;
                return Err(ServiceError::write(e));
            }
        };
        info!(record_id = %id, "service_record_created");
        Ok(Document::new(id, data).decode()?)
    }

    #[instrument(skip(self, input, files), fields(files = files.len()))]
    async fn update(&self, id: &str, input: ServiceRecordFields, files: Vec<ImageFile>) -> Result<ServiceRecord, ServiceError> {
        let mut record = self.get_by_id(id).await?;
        let added = self.upload(&files, &record.car_id).await?;

        let input = input.normalized();
        let (updated_at, now) = timestamp_now();
        let mut image_urls = record.image_urls.clone();
        image_urls.extend(added.iter().cloned());

        let mut patch = encode(&input)?;
        patch.insert("imageUrls".into(), url_list(&image_urls));
        patch.insert("updatedAt".into(), now);

        if let Err(e) = self.store.update(COLLECTION, id, patch).await {
            warn!(error = %e, uploaded = added.len(), "service record update failed");
            self.rollback(&added).await;
            return Err(write_error(e));
        }

        record.apply(input);
        record.image_urls = image_urls;
        record.updated_at = Some(updated_at);
        info!(record_id = %id, added = added.len(), "service_record_updated");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<String, ServiceError> {
        let record = self.get_by_id(id).await?;
        delete_best_effort(self.images.as_ref(), &record.image_urls).await;
        self.store.delete(COLLECTION, id).await.map_err(write_error)?;
        info!(record_id = %id, "service_record_deleted");
        Ok(id.to_string())
    }

    #[instrument(skip(self))]
    async fn remove_image(&self, id: &str, url: &str) -> Result<ImageRemoval, ServiceError> {
        let record = self.get_by_id(id).await?;
        if !record.image_urls.iter().any(|u| u == url) {
            return Err(ServiceError::ImageNotFound);
        }
        if !self.images.delete(url).await {
            warn!(url = %url, "remote image not deleted; detaching anyway");
        }

        let remaining: Vec<String> = record.image_urls.into_iter().filter(|u| u != url).collect();
        let (_, now) = timestamp_now();
        let mut patch = models::document::Fields::new();
        patch.insert("imageUrls".into(), url_list(&remaining));
        patch.insert("updatedAt".into(), now);
        self.store.update(COLLECTION, id, patch).await.map_err(write_error)?;

        info!(record_id = %id, remaining = remaining.len(), "service_record_image_removed");
        Ok(ImageRemoval { id: id.to_string(), remaining_image_urls: remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::mock::MockImageHost;
    use crate::storage::mock::FlakyStore;
    use crate::storage::JsonDocumentStore;
    use chrono::NaiveDate;
    use models::service_record::Part;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn repo_with<S: DocumentStore>(
        store: Arc<S>,
        policy: PolicyConfig,
    ) -> (DocumentServiceRecordRepository<S, MockImageHost>, Arc<MockImageHost>) {
        let host = Arc::new(MockImageHost::new());
        (DocumentServiceRecordRepository::new(store, host.clone(), policy), host)
    }

    fn files(n: u8) -> Vec<ImageFile> {
        (0..n).map(|i| ImageFile::new(format!("img{i}.jpg"), vec![i])).collect()
    }

    #[tokio::test]
    async fn create_uploads_into_vehicle_folder() -> Result<(), ServiceError> {
        let (repo, host) = repo_with(Arc::new(JsonDocumentStore::in_memory()), PolicyConfig::default());
        let mut fields = ServiceRecordFields::new(d(2024, 1, 10), 50_000);
        fields.parts = vec![Part::new("Mann", "W 610/3"), Part::default()];
        let record = repo.create(NewServiceRecord::new("c1", fields), files(2)).await?;

        assert_eq!(record.car_id, "c1");
        assert_eq!(record.image_urls.len(), 2);
        assert_eq!(record.parts.len(), 1);
        assert!(record.created_at.is_some());
        assert_eq!(host.folders(), vec!["services/c1", "services/c1"]);
        assert_eq!(repo.get_by_id(&record.id).await?, record);
        Ok(())
    }

    #[tokio::test]
    async fn partial_upload_failure_writes_nothing() {
        let store = Arc::new(FlakyStore::default());
        let (repo, host) = repo_with(store.clone(), PolicyConfig::default());
        host.fail_upload_at(2);
        let input = NewServiceRecord::new("c1", ServiceRecordFields::new(d(2024, 1, 10), 1));
        assert!(matches!(repo.create(input, files(3)).await, Err(ServiceError::Upload(_))));
        assert_eq!(store.writes(), 0);
        assert_eq!(host.deleted(), host.uploaded());
        assert_eq!(host.uploaded().len(), 1);
    }

    #[tokio::test]
    async fn failed_write_rolls_back_all_uploads() {
        let store = Arc::new(FlakyStore::default());
        let (repo, host) = repo_with(store.clone(), PolicyConfig::default());
        store.set_fail_writes(true);
        let input = NewServiceRecord::new("c1", ServiceRecordFields::new(d(2024, 1, 10), 1));
        assert!(matches!(repo.create(input, files(2)).await, Err(ServiceError::Write(_))));
        assert_eq!(host.deleted().len(), 2);
    }

    #[tokio::test]
    async fn list_orders_mixed_dates_descending() -> Result<(), anyhow::Error> {
        let store = Arc::new(JsonDocumentStore::in_memory());
        let (repo, _) = repo_with(store.clone(), PolicyConfig::default());
        let raw = [
            json!({"carId": "c1", "date": "2024-01-10", "task": "a"}),
            json!({"carId": "c1", "date": {"seconds": 1_717_200_000_i64, "nanoseconds": 0}, "task": "b"}),
            json!({"carId": "c1", "date": 1_672_531_200_000_i64, "task": "c"}),
            json!({"carId": "c2", "date": "2030-01-01", "task": "other"}),
            json!({"carId": "c1", "date": "2023-06", "task": "d"}),
        ];
        for doc in raw {
            store.add(COLLECTION, doc.as_object().cloned().unwrap_or_default()).await?;
        }
        let first = repo.list_for_vehicle("c1").await?;
        let tasks: Vec<_> = first.iter().map(|r| r.task.as_str()).collect();
        assert_eq!(tasks, vec!["b", "a", "d", "c"]);
        assert!(first.windows(2).all(|w| w[0].date >= w[1].date));
        assert_eq!(repo.list_for_vehicle("c1").await?, first);
        assert!(repo.list_for_vehicle("none").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn update_appends_images_and_keeps_owner() -> Result<(), ServiceError> {
        let (repo, host) = repo_with(Arc::new(JsonDocumentStore::in_memory()), PolicyConfig::default());
        let created = repo
            .create(NewServiceRecord::new("c1", ServiceRecordFields::new(d(2024, 1, 10), 50_000)), files(1))
            .await?;

        let mut fields = ServiceRecordFields::new(d(2024, 1, 11), 50_100);
        fields.task = "Oil change".into();
        let same = repo.update(&created.id, fields.clone(), vec![]).await?;
        assert_eq!(same.image_urls, created.image_urls);
        assert_eq!(same.odometer, 50_100);

        let grown = repo.update(&created.id, fields, files(2)).await?;
        assert_eq!(grown.image_urls.len(), 3);
        assert_eq!(grown.image_urls[0], created.image_urls[0]);
        assert_eq!(grown.car_id, "c1");
        assert_eq!(host.folders().last().map(String::as_str), Some("services/c1"));
        assert_eq!(repo.get_by_id(&created.id).await?.image_urls, grown.image_urls);
        Ok(())
    }

    #[tokio::test]
    async fn remove_image_filters_and_rejects_foreign_urls() -> Result<(), ServiceError> {
        let store = Arc::new(FlakyStore::default());
        let (repo, host) = repo_with(store.clone(), PolicyConfig::default());
        let created = repo
            .create(NewServiceRecord::new("c1", ServiceRecordFields::new(d(2024, 1, 10), 1)), files(2))
            .await?;

        let writes = store.writes();
        let err = repo.remove_image(&created.id, "https://elsewhere/x.jpg").await.unwrap_err();
        assert!(matches!(err, ServiceError::ImageNotFound));
        assert_eq!(err.to_string(), "Image not found in service entry");
        assert_eq!(store.writes(), writes);

        host.set_delete_result(false);
        let first = created.image_urls[0].clone();
        let removal = repo.remove_image(&created.id, &first).await?;
        assert_eq!(removal.id, created.id);
        assert_eq!(removal.remaining_image_urls, vec![created.image_urls[1].clone()]);
        assert_eq!(repo.get_by_id(&created.id).await?.image_urls, removal.remaining_image_urls);
        assert_eq!(host.deleted(), vec![first]);
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_record_and_images() -> Result<(), ServiceError> {
        let (repo, host) = repo_with(Arc::new(JsonDocumentStore::in_memory()), PolicyConfig::default());
        let created = repo
            .create(NewServiceRecord::new("c1", ServiceRecordFields::new(d(2024, 1, 10), 1)), files(2))
            .await?;
        assert_eq!(repo.delete(&created.id).await?, created.id);
        assert_eq!(host.deleted(), created.image_urls);
        let err = repo.get_by_id(&created.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Service entry not found");
        assert!(matches!(repo.delete(&created.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn delete_succeeds_when_image_deletion_fails() -> Result<(), ServiceError> {
        let (repo, host) = repo_with(Arc::new(JsonDocumentStore::in_memory()), PolicyConfig::default());
        let created = repo.create(NewServiceRecord::new("c1", ServiceRecordFields::new(d(2024, 1, 10), 1)), files(2)).await?;
        host.set_delete_result(false);

        assert_eq!(repo.delete(&created.id).await?, created.id);
        assert_eq!(host.deleted(), created.image_urls);
        assert!(matches!(repo.get_by_id(&created.id).await, Err(ServiceError::NotFound(_))));
        assert!(repo.list_for_vehicle("c1").await?.is_empty());
        Ok(())
    }
}
