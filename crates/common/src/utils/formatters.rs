//! Display formatting for dates and numeric vehicle/service values.
//!
//! Every formatter returns an empty string for empty, zero or unparseable
//! input so views can render the result without further checks.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

/// Default display pattern (`dd/MM/yyyy`).
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Pattern used for month-granularity values such as the registration date.
pub const MONTH_YEAR_FORMAT: &str = "%B %Y";

/// Parse the date shapes the forms and the store hand around:
/// `YYYY-MM-DD`, `YYYY-MM`, RFC 3339 and naive ISO date-times.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()
}

fn pattern_is_valid(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Format a parsed date with a strftime pattern; invalid patterns yield `""`.
pub fn format_naive_date(date: NaiveDate, pattern: &str) -> String {
    if !pattern_is_valid(pattern) {
        return String::new();
    }
    date.format(pattern).to_string()
}

/// Format raw date input for display, e.g. `2024-01-10` -> `10/01/2024`.
pub fn format_date(raw: &str, pattern: &str) -> String {
    match parse_date(raw) {
        Some(date) => format_naive_date(date, pattern),
        None => String::new(),
    }
}

/// Whole years elapsed between `date` and `today` (negative for future dates).
pub fn calculate_age(date: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - date.year();
    if (today.month(), today.day()) < (date.month(), date.day()) {
        years -= 1;
    }
    years
}

/// Age in years for raw date input, measured against the current UTC date.
pub fn calculate_age_from(raw: &str) -> Option<i32> {
    parse_date(raw).map(|date| calculate_age(date, Utc::now().date_naive()))
}

/// Parse the leading numeric prefix of `raw` (`"12.5 km"` -> `12.5`).
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return None;
    }
    // optional exponent, only consumed when followed by digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// `12.345` -> `"12.3 km/l"`.
pub fn format_fuel_consumption(value: Option<f64>) -> String {
    match present(value) {
        Some(v) => format!("{v:.1} km/l"),
        None => String::new(),
    }
}

/// `150.7` -> `"150 HP"`.
pub fn format_horsepower(value: Option<f64>) -> String {
    match present(value) {
        Some(v) => format!("{} HP", v.trunc() as i64),
        None => String::new(),
    }
}

/// `50000` -> `"50,000 km"`.
pub fn format_odometer(value: Option<f64>) -> String {
    match present(value) {
        Some(v) => format!("{} km", group_thousands(v.trunc() as i64)),
        None => String::new(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
