use chrono::{DateTime, NaiveDate, Utc};
use common::utils::validators::{validate_text, TextRules, REQUIRED_MESSAGE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates;
use crate::errors::{self, FieldError, ModelError};
use crate::serde_helpers;

/// A replaced or inspected part.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub part_number: String,
}

impl Part {
    pub fn new(manufacturer: impl Into<String>, part_number: impl Into<String>) -> Self {
        Self { manufacturer: manufacturer.into(), part_number: part_number.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.manufacturer.trim().is_empty() && self.part_number.trim().is_empty()
    }
}

/// Drop form rows where neither field was filled in. Duplicates are kept.
pub fn retain_filled(parts: Vec<Part>) -> Vec<Part> {
    parts.into_iter().filter(|p| !p.is_blank()).collect()
}

/// One maintenance event of a vehicle, as stored in `serviceEntries`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    #[serde(default)]
    pub car_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "dates::today", deserialize_with = "serde_helpers::date_or_today")]
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "serde_helpers::count")]
    pub odometer: u64,
    #[serde(default)]
    pub task: String,
    #[serde(default, deserialize_with = "serde_helpers::list_or_empty")]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub oil_changed: bool,
    #[serde(default, deserialize_with = "serde_helpers::list_or_empty")]
    pub image_urls: Vec<String>,
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    /// Overwrite the editable fields. `car_id` and `image_urls` are untouched.
    pub fn apply(&mut self, fields: ServiceRecordFields) {
        let fields = fields.normalized();
        self.description = fields.description;
        self.date = fields.date;
        self.odometer = fields.odometer.unwrap_or(0);
        self.task = fields.task;
        self.parts = fields.parts;
        self.oil_changed = fields.oil_changed;
    }
}

/// Editable service record fields. Has no `carId`: ownership is fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceRecordFields {
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "serde_helpers::strict_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub odometer: Option<u64>,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub oil_changed: bool,
}

impl Default for ServiceRecordFields {
    fn default() -> Self {
        Self {
            description: String::new(),
            date: dates::today(),
            odometer: None,
            task: String::new(),
            parts: Vec::new(),
            oil_changed: false,
        }
    }
}

impl ServiceRecordFields {
    pub fn new(date: NaiveDate, odometer: u64) -> Self {
        Self { date, odometer: Some(odometer), ..Self::default() }
    }

    /// Parse untrusted JSON. A missing or unreadable `date` is rejected rather
    /// than defaulted; unknown keys are rejected too.
    pub fn from_json(value: Value) -> Result<Self, ModelError> {
        if value.get("date").map_or(true, Value::is_null) {
            return Err(ModelError::Validation(format!("date: {REQUIRED_MESSAGE}")));
        }
        serde_json::from_value(value).map_err(|e| ModelError::Validation(e.to_string()))
    }

    pub fn normalized(mut self) -> Self {
        self.parts = retain_filled(self.parts);
        self
    }

    /// Description, task and odometer are required.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut out = Vec::new();
        let required = TextRules { required: true, ..TextRules::default() };
        if let Some(msg) = validate_text(&self.description, required) {
            out.push(FieldError::new("description", msg));
        }
        if self.odometer.is_none() {
            out.push(FieldError::new("odometer", REQUIRED_MESSAGE));
        }
        if let Some(msg) = validate_text(&self.task, required) {
            out.push(FieldError::new("task", msg));
        }
        out
    }

    pub fn ensure_valid(&self) -> Result<(), ModelError> {
        errors::check(self.validate())
    }
}

/// Creation input: the owning vehicle plus the editable fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceRecord {
    pub car_id: String,
    #[serde(flatten)]
    pub fields: ServiceRecordFields,
}

impl NewServiceRecord {
    pub fn new(car_id: impl Into<String>, fields: ServiceRecordFields) -> Self {
        Self { car_id: car_id.into(), fields }
    }

    /// Parse untrusted JSON: `carId` is required, everything else follows
    /// [`ServiceRecordFields::from_json`].
    pub fn from_json(value: Value) -> Result<Self, ModelError> {
        let Value::Object(mut map) = value else {
            return Err(ModelError::Validation("expected a JSON object".to_string()));
        };
        let car_id = match map.remove("carId") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => return Err(ModelError::Validation("carId is required".to_string())),
        };
        let fields = ServiceRecordFields::from_json(Value::Object(map))?;
        Ok(Self { car_id, fields })
    }

    pub fn normalized(self) -> Self {
        Self { car_id: self.car_id, fields: self.fields.normalized() }
    }
}
