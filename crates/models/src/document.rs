use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelError;

/// Field map of a stored document, keyed by the camelCase field names.
pub type Fields = Map<String, Value>;

/// A document as returned by the store: its identifier plus its fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self { id: id.into(), data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Decode into a record type, exposing the identifier as its `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ModelError> {
        let mut map = self.data.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(map))
            .map_err(|e| ModelError::Decode { id: self.id.clone(), reason: e.to_string() })
    }
}

/// Serialize a record or input type into a document field map.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, ModelError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ModelError::Encode(format!("expected an object, got {other}"))),
        Err(e) => Err(ModelError::Encode(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Named {
        id: String,
        name: String,
    }

    #[test]
    fn decode_injects_identifier() {
        let mut data = Fields::new();
        data.insert("name".into(), json!("Civic"));
        let doc = Document::new("abc", data);
        let named: Named = doc.decode().unwrap();
        assert_eq!(named, Named { id: "abc".into(), name: "Civic".into() });
    }

    #[test]
    fn decode_reports_document_id() {
        let doc = Document::new("broken", Fields::new());
        let err = doc.decode::<Named>().unwrap_err();
        assert!(matches!(err, ModelError::Decode { ref id, .. } if id == "broken"));
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode(&42).is_err());
        let map = encode(&json!({"a": 1})).unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
    }
}
