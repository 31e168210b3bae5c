use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use models::document::{Document, Fields};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use super::json_map_store::JsonMapStore;
use super::StoreError;

/// Length of generated document identifiers.
pub const ID_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters plus at most one ordering field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn matches(&self, data: &Fields) -> bool {
        self.filters.iter().all(|(field, expected)| data.get(field) == Some(expected))
    }
}

/// Collection-oriented document persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;
    /// Insert with a store-assigned identifier, returned on success.
    async fn add(&self, collection: &str, data: Fields) -> Result<String, StoreError>;
    /// Merge `patch` into an existing document; `Missing` when absent.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError>;
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;
}

pub fn generate_id() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(ID_LEN).map(char::from).collect()
}

/// Rank of a JSON value's type when ordering mixed fields.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over field values. Strings compare byte-wise, so `"Zeta" < "alpha"`.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// JSON-file document store: one `{collection}.json` per collection under a
/// data directory, or purely in memory.
pub struct JsonDocumentStore {
    data_dir: Option<PathBuf>,
    collections: DashMap<String, Arc<JsonMapStore<String, Fields>>>,
}

impl JsonDocumentStore {
    pub fn open<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self { data_dir: Some(data_dir.into()), collections: DashMap::new() }
    }

    pub fn in_memory() -> Self {
        Self { data_dir: None, collections: DashMap::new() }
    }

    async fn collection(&self, name: &str) -> Result<Arc<JsonMapStore<String, Fields>>, StoreError> {
        if let Some(existing) = self.collections.get(name) {
            return Ok(existing.clone());
        }
        let opened = match &self.data_dir {
            Some(dir) => JsonMapStore::open(dir.join(format!("{name}.json"))).await?,
            None => JsonMapStore::in_memory(),
        };
        debug!(collection = name, persistent = opened.is_persistent(), "collection ready");
        // a concurrent opener may have won; keep whichever landed first
        Ok(self.collections.entry(name.to_string()).or_insert(opened).clone())
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection).await?;
        Ok(coll.get(&id.to_string()).await.map(|data| Document::new(id, data)))
    }

    async fn add(&self, collection: &str, data: Fields) -> Result<String, StoreError> {
        let coll = self.collection(collection).await?;
        coll.update_map(|m| {
            let mut id = generate_id();
            while m.contains_key(&id) {
                id = generate_id();
            }
            m.insert(id.clone(), data);
            Ok(id)
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let coll = self.collection(collection).await?;
        coll.update_map(|m| {
            let doc = m.get_mut(id).ok_or_else(|| StoreError::Missing(id.to_string()))?;
            for (field, value) in patch {
                doc.insert(field, value);
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let coll = self.collection(collection).await?;
        coll.remove(&id.to_string()).await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let coll = self.collection(collection).await?;
        let mut docs: Vec<Document> = coll
            .list()
            .await
            .into_iter()
            .filter(|(_, data)| query.matches(data))
            .map(|(id, data)| Document::new(id, data))
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some((field, direction)) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        Ok(docs)
    }
}
