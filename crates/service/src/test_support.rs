#![cfg(test)]
//! Repositories whose list calls can be held open, for hook interleaving tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use configs::PolicyConfig;
use models::image::ImageFile;
use models::service_record::{NewServiceRecord, ServiceRecord, ServiceRecordFields};
use models::vehicle::{Vehicle, VehicleFields};
use tokio::sync::oneshot;

use crate::errors::ServiceError;
use crate::images::mock::MockImageHost;
use crate::service_records::{DocumentServiceRecordRepository, ImageRemoval, ServiceRecordRepository};
use crate::storage::mock::FlakyStore;
use crate::vehicles::{DocumentVehicleRepository, VehicleRepository};

/// Queue of gates handed out to list calls in call order.
#[derive(Default)]
pub struct Gates {
    queue: Mutex<VecDeque<oneshot::Receiver<()>>>,
    started: AtomicUsize,
}

impl Gates {
    /// Hold the next list call until the returned sender fires.
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.queue.lock().unwrap().push_back(rx);
        tx
    }

    async fn pass(&self) {
        let gate = self.queue.lock().unwrap().pop_front();
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub async fn wait_started(&self, n: usize) {
        while self.started.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

pub struct Gated<R> {
    pub inner: R,
    pub gates: Gates,
}

#[async_trait]
impl<R: VehicleRepository> VehicleRepository for Gated<R> {
    async fn list(&self) -> Result<Vec<Vehicle>, ServiceError> {
        self.gates.pass().await;
        self.inner.list().await
    }
    async fn get_by_id(&self, id: &str) -> Result<Vehicle, ServiceError> {
        self.inner.get_by_id(id).await
    }
    async fn create(&self, input: VehicleFields, image: Option<ImageFile>) -> Result<Vehicle, ServiceError> {
        self.inner.create(input, image).await
    }
    async fn update(&self, id: &str, input: VehicleFields, image: Option<ImageFile>) -> Result<Vehicle, ServiceError> {
        self.inner.update(id, input, image).await
    }
    async fn delete(&self, id: &str) -> Result<String, ServiceError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl<R: ServiceRecordRepository> ServiceRecordRepository for Gated<R> {
    async fn list_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<ServiceRecord>, ServiceError> {
        self.gates.pass().await;
        self.inner.list_for_vehicle(vehicle_id).await
    }
    async fn get_by_id(&self, id: &str) -> Result<ServiceRecord, ServiceError> {
        self.inner.get_by_id(id).await
    }
    async fn create(&self, input: NewServiceRecord, files: Vec<ImageFile>) -> Result<ServiceRecord, ServiceError> {
        self.inner.create(input, files).await
    }
    async fn update(&self, id: &str, input: ServiceRecordFields, files: Vec<ImageFile>) -> Result<ServiceRecord, ServiceError> {
        self.inner.update(id, input, files).await
    }
    async fn delete(&self, id: &str) -> Result<String, ServiceError> {
        self.inner.delete(id).await
    }
    async fn remove_image(&self, id: &str, url: &str) -> Result<ImageRemoval, ServiceError> {
        self.inner.remove_image(id, url).await
    }
}

pub type TestVehicles = Gated<DocumentVehicleRepository<FlakyStore, MockImageHost>>;
pub type TestRecords = Gated<DocumentServiceRecordRepository<FlakyStore, MockImageHost>>;

pub struct Fixture {
    pub store: Arc<FlakyStore>,
    pub host: Arc<MockImageHost>,
    pub vehicles: Arc<TestVehicles>,
    pub records: Arc<TestRecords>,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(FlakyStore::default());
    let host = Arc::new(MockImageHost::new());
    let vehicles = Arc::new(Gated {
        inner: DocumentVehicleRepository::new(store.clone(), host.clone(), PolicyConfig::default()),
        gates: Gates::default(),
    });
    let records = Arc::new(Gated {
        inner: DocumentServiceRecordRepository::new(store.clone(), host.clone(), PolicyConfig::default()),
        gates: Gates::default(),
    });
    Fixture { store, host, vehicles, records }
}
