//! Field validation rules used before submitting vehicle and service forms.
//!
//! Each validator returns `None` when the value is acceptable, otherwise the
//! message to show next to the field.

use chrono::NaiveDate;

use super::formatters::{parse_date, parse_number};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_DATE_MESSAGE: &str = "Please enter a valid date";

/// Default upload limit applied to image files.
pub const DEFAULT_MAX_FILE_SIZE_MB: f64 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NumberRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub required: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextRules {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRules {
    pub required: bool,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

pub fn validate_number(raw: &str, rules: NumberRules) -> Option<String> {
    if raw.trim().is_empty() {
        return rules.required.then(|| REQUIRED_MESSAGE.to_string());
    }
    let value = match parse_number(raw) {
        Some(v) if v.is_finite() => v,
        _ => return Some("Please enter a valid number".to_string()),
    };
    if let Some(min) = rules.min {
        if value < min {
            return Some(format!("Value must be at least {min}"));
        }
    }
    if let Some(max) = rules.max {
        if value > max {
            return Some(format!("Value must be at most {max}"));
        }
    }
    None
}

pub fn validate_text(value: &str, rules: TextRules) -> Option<String> {
    if value.trim().is_empty() {
        return rules.required.then(|| REQUIRED_MESSAGE.to_string());
    }
    let len = value.chars().count();
    if let Some(min) = rules.min_length {
        if len < min {
            return Some(format!("Text must be at least {min} characters"));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            return Some(format!("Text must be at most {max} characters"));
        }
    }
    None
}

fn short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

pub fn validate_date(raw: &str, rules: DateRules) -> Option<String> {
    if raw.trim().is_empty() {
        return rules.required.then(|| REQUIRED_MESSAGE.to_string());
    }
    let Some(date) = parse_date(raw) else {
        return Some(INVALID_DATE_MESSAGE.to_string());
    };
    if let Some(min) = rules.min_date {
        if date < min {
            return Some(format!("Date must be after {}", short_date(min)));
        }
    }
    if let Some(max) = rules.max_date {
        if date > max {
            return Some(format!("Date must be before {}", short_date(max)));
        }
    }
    None
}

pub fn validate_file_size(size_bytes: u64, max_size_mb: f64) -> Option<String> {
    let max_bytes = max_size_mb * 1024.0 * 1024.0;
    if size_bytes as f64 > max_bytes {
        return Some(format!("File size must be less than {max_size_mb} MB"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_rules() {
        let rules = NumberRules { min: Some(0.0), max: Some(2000.0), required: true };
        assert_eq!(validate_number("", rules).as_deref(), Some(REQUIRED_MESSAGE));
        assert_eq!(validate_number("", NumberRules::default()), None);
        assert_eq!(validate_number("abc", rules).as_deref(), Some("Please enter a valid number"));
        assert_eq!(validate_number("-1", rules).as_deref(), Some("Value must be at least 0"));
        assert_eq!(validate_number("2500", rules).as_deref(), Some("Value must be at most 2000"));
        assert_eq!(validate_number("150", rules), None);
    }

    #[test]
    fn text_rules() {
        let rules = TextRules { required: true, min_length: Some(2), max_length: Some(5) };
        assert_eq!(validate_text("   ", rules).as_deref(), Some(REQUIRED_MESSAGE));
        assert_eq!(validate_text("", TextRules::default()), None);
        assert_eq!(validate_text("a", rules).as_deref(), Some("Text must be at least 2 characters"));
        assert_eq!(validate_text("abcdef", rules).as_deref(), Some("Text must be at most 5 characters"));
        assert_eq!(validate_text("Civic", rules), None);
    }

    #[test]
    fn date_rules() {
        let rules = DateRules {
            required: true,
            min_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            max_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        };
        assert_eq!(validate_date("", rules).as_deref(), Some(REQUIRED_MESSAGE));
        assert_eq!(validate_date("31/12", rules).as_deref(), Some("Please enter a valid date"));
        assert_eq!(validate_date("2024-01-01", rules).as_deref(), Some("Date must be after 1/10/2024"));
        assert_eq!(validate_date("2025-01-01", rules).as_deref(), Some("Date must be before 12/31/2024"));
        assert_eq!(validate_date("2024-06-01", rules), None);
    }

    #[test]
    fn file_size_limit() {
        assert_eq!(validate_file_size(1024, DEFAULT_MAX_FILE_SIZE_MB), None);
        assert_eq!(validate_file_size(5 * 1024 * 1024, DEFAULT_MAX_FILE_SIZE_MB), None);
        assert_eq!(
            validate_file_size(5 * 1024 * 1024 + 1, DEFAULT_MAX_FILE_SIZE_MB).as_deref(),
            Some("File size must be less than 5 MB")
        );
    }
}
