//! Runtime environment helpers
//!
//! `ensure_env` wraps `common::env` so binaries only import `service`;
//! `Backend` wires store, image host and repositories from `AppConfig`.

use std::sync::Arc;

use configs::{AppConfig, PolicyConfig};
use tracing::info;

use crate::images::{HttpImageHost, ImageHost};
use crate::service_records::DocumentServiceRecordRepository;
use crate::storage::{DocumentStore, JsonDocumentStore};
use crate::vehicles::DocumentVehicleRepository;

/// Ensure the data directory exists; an empty path keeps the store in memory.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_env(data_dir).await
}

/// Every long-lived handle the data-access layer needs.
pub struct Backend<S: DocumentStore = JsonDocumentStore, H: ImageHost = HttpImageHost> {
    pub store: Arc<S>,
    pub images: Arc<H>,
    pub vehicles: Arc<DocumentVehicleRepository<S, H>>,
    pub service_records: Arc<DocumentServiceRecordRepository<S, H>>,
}

impl<S: DocumentStore, H: ImageHost> Backend<S, H> {
    pub fn assemble(store: Arc<S>, images: Arc<H>, policy: PolicyConfig) -> Self {
        let vehicles = Arc::new(DocumentVehicleRepository::new(store.clone(), images.clone(), policy.clone()));
        let service_records = Arc::new(DocumentServiceRecordRepository::new(store.clone(), images.clone(), policy));
        Self { store, images, vehicles, service_records }
    }
}

impl Backend {
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let store = match cfg.store.data_dir() {
            Some(dir) => JsonDocumentStore::open(dir),
            None => JsonDocumentStore::in_memory(),
        };
        let images = HttpImageHost::new(cfg.images.clone())?;
        info!(
            data_dir = cfg.store.data_dir().unwrap_or("<memory>"),
            cloud = %cfg.images.cloud_name,
            deletion_enabled = cfg.images.deletion_enabled,
            cascade = cfg.policy.cascade_service_records,
            rollback = cfg.policy.rollback_partial_uploads,
            "backend assembled"
        );
        Ok(Self::assemble(Arc::new(store), Arc::new(images), cfg.policy.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::mock::MockImageHost;
    use crate::service_records::ServiceRecordRepository;
    use crate::vehicles::VehicleRepository;
    use chrono::NaiveDate;
    use models::service_record::{NewServiceRecord, ServiceRecordFields};
    use models::vehicle::VehicleFields;

    #[tokio::test]
    async fn from_config_persists_under_data_dir() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("fixo_backend_{}", uuid::Uuid::new_v4()));
        let mut cfg = AppConfig::default();
        cfg.store.data_dir = dir.to_string_lossy().to_string();
        cfg.images.cloud_name = "demo".into();
        cfg.images.upload_preset = "tracker".into();
        ensure_env(&cfg.store.data_dir).await?;

        let backend = Backend::from_config(&cfg)?;
        let car = backend.vehicles.create(VehicleFields::new("Civic", "EK4"), None).await?;
        assert!(dir.join("cars.json").exists());
        assert_eq!(backend.vehicles.list().await?.len(), 1);
        assert_eq!(backend.vehicles.get_by_id(&car.id).await?.name, "Civic");

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn repositories_share_one_store() -> anyhow::Result<()> {
        let backend = Backend::assemble(
            Arc::new(JsonDocumentStore::in_memory()),
            Arc::new(MockImageHost::new()),
            PolicyConfig { cascade_service_records: true, ..PolicyConfig::default() },
        );
        let car = backend.vehicles.create(VehicleFields::new("Civic", "EK4"), None).await?;
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        backend
            .service_records
            .create(NewServiceRecord::new(car.id.clone(), ServiceRecordFields::new(date, 1)), vec![])
            .await?;
        backend.vehicles.delete(&car.id).await?;
        assert!(backend.service_records.list_for_vehicle(&car.id).await?.is_empty());
        Ok(())
    }
}
