use chrono::{DateTime, NaiveDate, Utc};
use common::utils::validators::{validate_number, validate_text, NumberRules, TextRules};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates;
use crate::errors::{self, FieldError, ModelError};
use crate::serde_helpers;

/// A tracked car and its technical data, as stored in `cars`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Month granularity, stored as the first day of the month.
    #[serde(default, deserialize_with = "serde_helpers::opt_month")]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_number: String,
    #[serde(default)]
    pub engine_code: String,
    #[serde(default, deserialize_with = "serde_helpers::opt_number")]
    pub horse_power: Option<f64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_number")]
    pub fuel_consumption: Option<f64>,
    #[serde(default)]
    pub color_name: String,
    #[serde(default)]
    pub color_code: String,
    #[serde(default, deserialize_with = "serde_helpers::opt_date")]
    pub next_inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub vin_number: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    /// Overwrite every user-editable field with `fields`.
    pub fn apply(&mut self, fields: VehicleFields) {
        let fields = fields.normalized();
        self.name = fields.name;
        self.description = fields.description;
        self.registration_date = fields.registration_date;
        self.registration_number = fields.registration_number;
        self.engine_code = fields.engine_code;
        self.horse_power = fields.horse_power;
        self.fuel_consumption = fields.fuel_consumption;
        self.color_name = fields.color_name;
        self.color_code = fields.color_code;
        self.next_inspection_date = fields.next_inspection_date;
        self.vin_number = fields.vin_number;
    }

    /// Whole years since registration, measured against `today`.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        self.registration_date
            .map(|reg| common::utils::formatters::calculate_age(reg, today))
    }
}

/// User-supplied vehicle fields for create and update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VehicleFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Accepts `YYYY-MM` as well as full dates.
    #[serde(default, deserialize_with = "serde_helpers::opt_month")]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_number: String,
    #[serde(default)]
    pub engine_code: String,
    #[serde(default)]
    pub horse_power: Option<f64>,
    #[serde(default)]
    pub fuel_consumption: Option<f64>,
    #[serde(default)]
    pub color_name: String,
    #[serde(default)]
    pub color_code: String,
    #[serde(default)]
    pub next_inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub vin_number: String,
}

impl VehicleFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), ..Self::default() }
    }

    /// Parse untrusted JSON input; unknown fields are rejected.
    pub fn from_json(value: Value) -> Result<Self, ModelError> {
        serde_json::from_value(value).map_err(|e| ModelError::Validation(e.to_string()))
    }

    /// Registration dates carry month granularity only.
    pub fn normalized(mut self) -> Self {
        self.registration_date = self.registration_date.map(dates::month_start);
        self
    }

    /// Form-level checks run before submission.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut out = Vec::new();
        let required = TextRules { required: true, ..TextRules::default() };
        if let Some(msg) = validate_text(&self.name, required) {
            out.push(FieldError::new("name", msg));
        }
        if let Some(msg) = validate_text(&self.description, required) {
            out.push(FieldError::new("description", msg));
        }
        let non_negative = NumberRules { min: Some(0.0), ..NumberRules::default() };
        if let Some(hp) = self.horse_power {
            if let Some(msg) = validate_number(&hp.to_string(), non_negative) {
                out.push(FieldError::new("horsePower", msg));
            }
        }
        if let Some(fc) = self.fuel_consumption {
            if let Some(msg) = validate_number(&fc.to_string(), non_negative) {
                out.push(FieldError::new("fuelConsumption", msg));
            }
        }
        out
    }

    pub fn ensure_valid(&self) -> Result<(), ModelError> {
        errors::check(self.validate())
    }
}
