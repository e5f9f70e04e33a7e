//! Field rules evaluated before a handler touches storage. Each request
//! builds a [`Checks`], runs its rules in order, and `finish` turns any
//! failures into one aggregated `Validation failed` response.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex should not panic")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("static regex should not panic"));

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.fail(field, message);
        }
    }

    /// Present and non-blank. Returns the trimmed value.
    pub fn required(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.map(str::trim) {
            Some(text) if !text.is_empty() => Some(text.to_string()),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    /// Absent is fine; present must be non-blank.
    pub fn not_blank(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        let text = value?.trim();
        if text.is_empty() {
            self.fail(field, message);
            return None;
        }
        Some(text.to_string())
    }

    pub fn max_chars(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
        if value.is_some_and(|text| text.trim().chars().count() > max) {
            self.fail(field, message);
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.map(str::trim) {
            Some(text) if is_email(text) => Some(text.to_ascii_lowercase()),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    pub fn optional_email(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        value?;
        self.email(field, value, message)
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.map(str::trim) {
            Some(text) if is_phone(text) => Some(text.to_string()),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    pub fn optional_phone(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.map(str::trim) {
            None | Some("") => None,
            Some(_) => self.phone(field, value, message),
        }
    }

    pub fn required_email(
        &mut self,
        field: &str,
        value: Option<&str>,
        missing: &str,
        invalid: &str,
    ) -> Option<String> {
        if value.is_none_or(|text| text.trim().is_empty()) {
            self.fail(field, missing);
            return None;
        }
        self.email(field, value, invalid)
    }

    pub fn required_phone(
        &mut self,
        field: &str,
        value: Option<&str>,
        missing: &str,
        invalid: &str,
    ) -> Option<String> {
        if value.is_none_or(|text| text.trim().is_empty()) {
            self.fail(field, missing);
            return None;
        }
        self.phone(field, value, invalid)
    }

    pub fn required_number(
        &mut self,
        field: &str,
        value: Option<f64>,
        missing: &str,
        negative: &str,
    ) -> Option<f64> {
        match value {
            Some(number) if number.is_finite() && number >= 0.0 => Some(number),
            Some(_) => {
                self.fail(field, negative);
                None
            }
            None => {
                self.fail(field, missing);
                None
            }
        }
    }

    pub fn required_amount(
        &mut self,
        field: &str,
        value: Option<Decimal>,
        missing: &str,
        negative: &str,
    ) -> Option<Decimal> {
        match value {
            Some(amount) if !amount.is_sign_negative() || amount.is_zero() => Some(amount),
            Some(_) => {
                self.fail(field, negative);
                None
            }
            None => {
                self.fail(field, missing);
                None
            }
        }
    }

    /// Finite, non-negative and no larger than `max`.
    pub fn bounded(
        &mut self,
        field: &str,
        value: Option<f64>,
        max: f64,
        negative: &str,
        too_large: &str,
    ) {
        match value {
            Some(number) if !number.is_finite() || number < 0.0 => self.fail(field, negative),
            Some(number) if number > max => self.fail(field, too_large),
            _ => {}
        }
    }

    pub fn non_negative_amount(&mut self, field: &str, value: Option<Decimal>, message: &str) {
        if value.is_some_and(|amount| amount.is_sign_negative() && !amount.is_zero()) {
            self.fail(field, message);
        }
    }

    pub fn id(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<Uuid> {
        match value.and_then(|raw| Uuid::parse_str(raw.trim()).ok()) {
            Some(id) => Some(id),
            None => {
                self.fail(field, message);
                None
            }
        }
    }

    pub fn date(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<DateTime<Utc>> {
        match value.and_then(parse_datetime) {
            Some(at) => Some(at),
            None => {
                self.fail(field, message);
                None
            }
        }
    }

    #[cfg(test)]
    fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(ApiError::Validation {
            message: "Validation failed".to_string(),
            errors: self.errors,
        })
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_phone(value: &str) -> bool {
    PHONE.is_match(value)
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates taken as midnight UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Path ids that are not UUIDs are reported with the resource's own message.
pub fn parse_id(raw: &str, message: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(message))
}
