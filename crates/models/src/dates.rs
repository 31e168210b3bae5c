//! Remote date normalization.
//!
//! Documents written by different clients carry dates as `{seconds, nanoseconds}`
//! timestamps, epoch milliseconds, RFC 3339 strings or plain `YYYY-MM-DD` /
//! `YYYY-MM` strings. Everything is normalized to `NaiveDate` / `DateTime<Utc>`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use common::utils::formatters::parse_date;
use serde_json::Value;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Parse registration input (`YYYY-MM`, or a full date) to the first of its month.
pub fn parse_registration_month(raw: &str) -> Option<NaiveDate> {
    parse_date(raw).map(month_start)
}

fn timestamp_from_parts(value: &Value) -> Option<DateTime<Utc>> {
    let obj = value.as_object()?;
    let seconds = obj.get("seconds").or_else(|| obj.get("_seconds"))?.as_i64()?;
    let nanos = obj
        .get("nanoseconds")
        .or_else(|| obj.get("_nanoseconds"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    DateTime::<Utc>::from_timestamp(seconds, u32::try_from(nanos).ok()?)
}

pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc())),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::Object(_) => timestamp_from_parts(value),
        _ => None,
    }
}

pub fn date_from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        _ => timestamp_from_value(value).map(|dt| dt.date_naive()),
    }
}
