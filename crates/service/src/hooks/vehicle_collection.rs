use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use models::image::ImageFile;
use models::vehicle::{Vehicle, VehicleFields};
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{Cache, InFlight, Operation, Outcome};
use crate::vehicles::VehicleRepository;

/// Cached list of every vehicle, in the repository's name order.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use service::hooks::VehicleCollection;
/// use service::images::mock::MockImageHost;
/// use service::storage::JsonDocumentStore;
/// use service::vehicles::DocumentVehicleRepository;
/// use models::vehicle::VehicleFields;
///
/// let repo = Arc::new(DocumentVehicleRepository::new(
///     Arc::new(JsonDocumentStore::in_memory()),
///     Arc::new(MockImageHost::new()),
///     Default::default(),
/// ));
/// tokio_test::block_on(async {
///     let cars = VehicleCollection::mount(repo).await;
///     assert!(cars.vehicles().await.is_empty());
///     let civic = cars.create(VehicleFields::new("Civic", "EK4"), None).await.unwrap();
///     assert_eq!(cars.vehicles().await, vec![civic]);
///     assert!(!cars.loading());
/// });
/// ```
pub struct VehicleCollection<R: VehicleRepository> {
    repo: Arc<R>,
    cache: RwLock<Cache<Vehicle>>,
    in_flight: InFlight,
    generation: AtomicU64,
}

impl<R: VehicleRepository> VehicleCollection<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            cache: RwLock::new(Cache::default()),
            in_flight: InFlight::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Create the hook and run the initial fetch.
    pub async fn mount(repo: Arc<R>) -> Self {
        let hook = Self::new(repo);
        hook.fetch().await;
        hook
    }

    pub async fn vehicles(&self) -> Vec<Vehicle> {
        self.cache.read().await.items.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.cache.read().await.error.clone()
    }

    /// True while any call of this hook is in flight.
    pub fn loading(&self) -> bool {
        self.in_flight.any()
    }

    pub fn is_pending(&self, op: Operation) -> bool {
        self.in_flight.is_pending(op)
    }

    async fn begin_call(&self) {
        self.cache.write().await.error = None;
    }

    async fn fail(&self, op: Operation, message: String) {
        error!(?op, error = %message, "vehicle operation failed");
        self.cache.write().await.error = Some(message);
    }

    /// Replace the cache with a fresh list.
    ///
    /// `None` on failure, and also when a newer fetch started meanwhile: the
    /// stale result is dropped rather than written over the newer one.
    pub async fn fetch(&self) -> Option<Vec<Vehicle>> {
        let _guard = self.in_flight.begin(Operation::Fetch);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.begin_call().await;

        let result = self.repo.list().await;
        let mut cache = self.cache.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding superseded vehicle fetch");
            return None;
        }
        match result {
            Ok(vehicles) => {
                cache.items = vehicles.clone();
                Some(vehicles)
            }
            Err(e) => {
                drop(cache);
                self.fail(Operation::Fetch, e.to_string()).await;
                None
            }
        }
    }

    /// Appends the new vehicle; the cache is not re-sorted until the next fetch.
    pub async fn create(&self, input: VehicleFields, image: Option<ImageFile>) -> Option<Vehicle> {
        let _guard = self.in_flight.begin(Operation::Create);
        self.begin_call().await;
        match self.repo.create(input, image).await {
            Ok(vehicle) => {
                self.cache.write().await.items.push(vehicle.clone());
                Some(vehicle)
            }
            Err(e) => {
                self.fail(Operation::Create, e.to_string()).await;
                None
            }
        }
    }

    pub async fn update(&self, id: &str, input: VehicleFields, image: Option<ImageFile>) -> Option<Vehicle> {
        let _guard = self.in_flight.begin(Operation::Update);
        self.begin_call().await;
        match self.repo.update(id, input, image).await {
            Ok(vehicle) => {
                let mut cache = self.cache.write().await;
                for slot in cache.items.iter_mut().filter(|v| v.id == vehicle.id) {
                    *slot = vehicle.clone();
                }
                Some(vehicle)
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
                self.cache.write().await.items.retain(|v| v.id != removed);
                Outcome::ok()
            }
            Err(e) => {
                let message = e.to_string();
                self.fail(Operation::Delete, message.clone()).await;
                Outcome::failed(message)
            }
        }
    }
}
