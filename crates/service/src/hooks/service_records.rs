use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use models::image::ImageFile;
use models::service_record::{NewServiceRecord, ServiceRecord, ServiceRecordFields};
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{Cache, InFlight, Operation, Outcome};
use crate::service_records::ServiceRecordRepository;

#[derive(Debug, Default)]
struct Scoped {
    vehicle_id: Option<String>,
    cache: Cache<ServiceRecord>,
}

/// Cached service history of one vehicle, newest first.
///
/// The scope may be empty (`None`); nothing is fetched until a vehicle is set.
pub struct ServiceRecordsForVehicle<R: ServiceRecordRepository> {
    repo: Arc<R>,
    state: RwLock<Scoped>,
    in_flight: InFlight,
    generation: AtomicU64,
}

impl<R: ServiceRecordRepository> ServiceRecordsForVehicle<R> {
    pub fn new(repo: Arc<R>, vehicle_id: Option<String>) -> Self {
        Self {
            repo,
            state: RwLock::new(Scoped { vehicle_id, cache: Cache::default() }),
            in_flight: InFlight::default(),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn mount(repo: Arc<R>, vehicle_id: Option<String>) -> Self {
        let hook = Self::new(repo, vehicle_id);
        hook.fetch().await;
        hook
    }

    pub async fn vehicle_id(&self) -> Option<String> {
        self.state.read().await.vehicle_id.clone()
    }

    pub async fn records(&self) -> Vec<ServiceRecord> {
        self.state.read().await.cache.items.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.cache.error.clone()
    }

    pub fn loading(&self) -> bool {
        self.in_flight.any()
    }

    pub fn is_pending(&self, op: Operation) -> bool {
        self.in_flight.is_pending(op)
    }

    async fn begin_call(&self) {
        self.state.write().await.cache.error = None;
    }

    async fn fail(&self, op: Operation, message: String) {
        error!(?op, error = %message, "service record operation failed");
        self.state.write().await.cache.error = Some(message);
    }

    /// Switch to another vehicle. The cache is emptied, fetches still running
    /// for the previous vehicle are invalidated and the new history is loaded.
    pub async fn set_vehicle(&self, vehicle_id: Option<String>) -> Option<Vec<ServiceRecord>> {
        {
            let mut state = self.state.write().await;
            if state.vehicle_id == vehicle_id {
                return None;
            }
            state.vehicle_id = vehicle_id;
            state.cache = Cache::default();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.fetch().await
    }

    /// Reload the current vehicle's history. `None` when no vehicle is set,
    /// on failure, or when the result was superseded by a newer fetch or a
    /// scope change.
    pub async fn fetch(&self) -> Option<Vec<ServiceRecord>> {
        let (vehicle_id, generation) = {
            let state = self.state.read().await;
            let Some(id) = state.vehicle_id.clone() else {
                return None;
            };
            (id, self.generation.fetch_add(1, Ordering::SeqCst) + 1)
        };
        let _guard = self.in_flight.begin(Operation::Fetch);
        self.begin_call().await;

        let result = self.repo.list_for_vehicle(&vehicle_id).await;
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(vehicle_id = %vehicle_id, generation, "discarding superseded service record fetch");
            return None;
        }
        match result {
            Ok(records) => {
                state.cache.items = records.clone();
                Some(records)
            }
            Err(e) => {
                drop(state);
                self.fail(Operation::Fetch, e.to_string()).await;
                None
            }
        }
    }

    /// Prepends the record when it belongs to the vehicle currently in scope.
    pub async fn create(&self, input: NewServiceRecord, files: Vec<ImageFile>) -> Option<ServiceRecord> {
        let _guard = self.in_flight.begin(Operation::Create);
        self.begin_call().await;
        match self.repo.create(input, files).await {
            Ok(record) => {
                let mut state = self.state.write().await;
                if state.vehicle_id.as_deref() == Some(record.car_id.as_str()) {
                    state.cache.items.insert(0, record.clone());
                }
                Some(record)
            }
            Err(e) => {
                self.fail(Operation::Create, e.to_string()).await;
                None
            }
        }
    }

    pub async fn update(&self, id: &str, input: ServiceRecordFields, files: Vec<ImageFile>) -> Option<ServiceRecord> {
        let _guard = self.in_flight.begin(Operation::Update);
        self.begin_call().await;
        match self.repo.update(id, input, files).await {
            Ok(record) => {
                let mut state = self.state.write().await;
                for slot in state.cache.items.iter_mut().filter(|r| r.id == record.id) {
                    *slot = record.clone();
                }
                Some(record)
            }
            Err(e) => {
                self.fail(Operation::Update, e.to_string()).await;
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Outcome {
        let _guard = self.in_flight.begin(Operation::Delete);
        self.begin_call().await;
        match self.repo.delete(id).await {
            Ok(removed) => {
                self.state.write().await.cache.items.retain(|r| r.id != removed);
                Outcome::ok()
            }
            Err(e) => {
                let message = e.to_string();
                self.fail(Operation::Delete, message.clone()).await;
                Outcome::failed(message)
            }
        }
    }

    /// Detach one photo; only `image_urls` of the cached record changes.
    pub async fn remove_image(&self, id: &str, url: &str) -> Outcome {
        let _guard = self.in_flight.begin(Operation::RemoveImage);
        self.begin_call().await;
        match self.repo.remove_image(id, url).await {
            Ok(removal) => {
                let mut state = self.state.write().await;
                for record in state.cache.items.iter_mut().filter(|r| r.id == removal.id) {
                    record.image_urls = removal.remaining_image_urls.clone();
                }
                Outcome::ok()
            }
            Err(e) => {
                let message = e.to_string();
                self.fail(Operation::RemoveImage, message.clone()).await;
                Outcome::failed(message)
            }
        }
    }
}
