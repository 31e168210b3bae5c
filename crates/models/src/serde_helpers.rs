//! `deserialize_with` helpers that accept what older clients stored.

use chrono::{DateTime, NaiveDate, Utc};
use common::utils::formatters::parse_number;
use common::utils::validators::INVALID_DATE_MESSAGE;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::dates;

pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(dates::date_from_value))
}

pub fn opt_month<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    Ok(opt_date(d)?.map(dates::month_start))
}

/// Service dates are never absent on read; unusable values fall back to today.
pub fn date_or_today<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    match value.as_ref().and_then(dates::date_from_value) {
        Some(date) => Ok(date),
        None => {
            warn!(raw = ?value, "unreadable service date; using today");
            Ok(dates::today())
        }
    }
}

/// Form input: the date must be present and readable.
pub fn strict_date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    value
        .as_ref()
        .and_then(dates::date_from_value)
        .ok_or_else(|| D::Error::custom(format!("date: {INVALID_DATE_MESSAGE}")))
}

pub fn opt_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(dates::timestamp_from_value))
}

/// Numbers that may have been stored as form strings (`"150"`, `""`).
pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(&s),
        _ => None,
    })
}

pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => parse_number(&s).filter(|f| *f >= 0.0).map(|f| f as u64),
        _ => None,
    };
    Ok(number.unwrap_or(0))
}

/// `null` and missing lists both read as empty.
pub fn list_or_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}
