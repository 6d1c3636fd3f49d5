//! Form intake: opaque key/value submissions to typed field values.
//!
//! # Responsibility
//! - Hold submitted form fields exactly as the shell sends them.
//! - Provide the parsing primitives every register input uses, with one
//!   defaulting policy instead of ad hoc parse-with-fallback at call sites.
//!
//! # Invariants
//! - Text values are trimmed; blank optional values become `None`.
//! - Unparsable, empty or zero rating fields fall back to the caller default.
//! - A rating that parses to a value outside `1..=5` is a validation error.
//! - Dates use `YYYY-MM-DD`.

use crate::model::record::ValidationError;
use crate::model::risk::{RATING_MAX, RATING_MIN};
use chrono::NaiveDate;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Submitted form payload. Keys may repeat (checkbox groups).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload from `(key, value)` pairs in submission order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Appends one field; builder style for tests and adapters.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == key)
            .map(|(_, value)| value.as_str())
    }

    /// Every non-blank value for `key`, trimmed, in submission order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(field, _)| field == key)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Trimmed text, empty string when absent.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(str::trim).unwrap_or_default().to_string()
    }

    /// Trimmed text that must not be blank.
    pub fn required_text(&self, key: &'static str) -> Result<String, ValidationError> {
        let value = self.text(key);
        if value.is_empty() {
            return Err(ValidationError::BlankField(key));
        }
        Ok(value)
    }

    /// Trimmed text, `None` when absent or blank.
    pub fn optional_text(&self, key: &str) -> Option<String> {
        let value = self.text(key);
        (!value.is_empty()).then_some(value)
    }

    /// Likelihood/severity rating with default-on-malformed policy.
    pub fn rating_or(&self, key: &'static str, default: u8) -> Result<u8, ValidationError> {
        let parsed = match self.get(key).map(str::trim) {
            Some(raw) => leading_integer(raw),
            None => None,
        };

        match parsed {
            None | Some(0) => Ok(default),
            Some(value) if (i64::from(RATING_MIN)..=i64::from(RATING_MAX)).contains(&value) => {
                Ok(value as u8)
            }
            Some(value) => Err(ValidationError::RatingOutOfRange { field: key, value }),
        }
    }

    /// Checkbox-style flag: `on`, `true`, `1` or `yes`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key)
                .map(|value| value.trim().to_ascii_lowercase())
                .as_deref(),
            Some("on" | "true" | "1" | "yes")
        )
    }

    /// Optional `YYYY-MM-DD` date.
    pub fn optional_date(&self, key: &'static str) -> Result<Option<NaiveDate>, ValidationError> {
        match self.optional_text(key) {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map(Some)
                .map_err(|_| ValidationError::InvalidField {
                    field: key,
                    reason: format!("expected YYYY-MM-DD date, got `{raw}`"),
                }),
        }
    }

    /// Required `YYYY-MM-DD` date.
    pub fn required_date(&self, key: &'static str) -> Result<NaiveDate, ValidationError> {
        self.optional_date(key)?
            .ok_or(ValidationError::BlankField(key))
    }

    /// Optional UUID reference (user ids, owner ids).
    pub fn optional_uuid(&self, key: &'static str) -> Result<Option<Uuid>, ValidationError> {
        match self.optional_text(key) {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|_| ValidationError::InvalidField {
                    field: key,
                    reason: format!("expected id, got `{raw}`"),
                }),
        }
    }
}

/// Mirrors lenient integer parsing of form text: optional sign followed by
/// leading digits; trailing garbage is ignored, no digits yields `None`.
fn leading_integer(raw: &str) -> Option<i64> {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}
