use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\-\s()]+$").expect("valid phone pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every rule that failed for one request, reported together as a 422.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// How an absent or blank input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-blank.
    Required,
    /// May be absent, but a present value must be non-blank (partial updates).
    NonEmpty,
    /// Absent and blank both mean "no value".
    Optional,
}

fn present(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    presence: Presence,
) -> Option<String> {
    match raw.map(|value| value.trim().to_owned()) {
        None => {
            if presence == Presence::Required {
                errors.push(field, "Required");
            }
            None
        }
        Some(value) if value.is_empty() => {
            if presence != Presence::Optional {
                errors.push(field, "Must not be empty");
            }
            None
        }
        Some(value) => Some(value),
    }
}

pub fn text(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    presence: Presence,
    max: usize,
) -> Option<String> {
    let value = present(errors, field, raw, presence)?;
    if value.chars().count() > max {
        errors.push(field, format!("Must be at most {max} characters"));
        return None;
    }
    Some(value)
}

pub fn choice<T: FromStr>(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    presence: Presence,
) -> Option<T> {
    let value = present(errors, field, raw, presence)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(field, format!("Invalid value '{value}'"));
            None
        }
    }
}

pub fn date(errors: &mut FieldErrors, field: &str, raw: Option<String>) -> Option<NaiveDate> {
    date_with(errors, field, raw, Presence::Optional)
}

pub fn date_with(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    presence: Presence,
) -> Option<NaiveDate> {
    let value = present(errors, field, raw, presence)?;
    match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(field, "Expected a date as YYYY-MM-DD");
            None
        }
    }
}

/// RFC 3339 timestamps, normalised to UTC.
pub fn timestamp(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
) -> Option<DateTime<Utc>> {
    let value = present(errors, field, raw, Presence::Optional)?;
    match DateTime::parse_from_rfc3339(&value) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(_) => {
            errors.push(field, "Expected an RFC 3339 timestamp");
            None
        }
    }
}

pub fn uuid(errors: &mut FieldErrors, field: &str, raw: Option<String>) -> Option<Uuid> {
    let value = present(errors, field, raw, Presence::Optional)?;
    match Uuid::parse_str(&value) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(field, "Invalid uuid");
            None
        }
    }
}

pub fn email(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    presence: Presence,
) -> Option<String> {
    let value = text(errors, field, raw, presence, 320)?;
    if !EMAIL_PATTERN.is_match(&value) {
        errors.push(field, "Invalid email");
        return None;
    }
    Some(value)
}

pub fn phone(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    presence: Presence,
) -> Option<String> {
    let value = text(errors, field, raw, presence, 50)?;
    if !PHONE_PATTERN.is_match(&value) {
        errors.push(field, "Invalid phone number format");
        return None;
    }
    Some(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: f64,
    min_exclusive: bool,
    max: f64,
}

impl Bounds {
    /// `0 < value <= max`
    pub const fn positive(max: f64) -> Self {
        Bounds {
            min: 0.0,
            min_exclusive: true,
            max,
        }
    }

    /// `min <= value <= max`
    pub const fn range(min: f64, max: f64) -> Self {
        Bounds {
            min,
            min_exclusive: false,
            max,
        }
    }

    /// `min <= value`
    pub const fn at_least(min: f64) -> Self {
        Bounds {
            min,
            min_exclusive: false,
            max: f64::MAX,
        }
    }

    fn admits(&self, value: f64) -> bool {
        let above = if self.min_exclusive { value > self.min } else { value >= self.min };
        value.is_finite() && above && value <= self.max
    }

    fn describe(&self) -> String {
        if self.max == f64::MAX {
            format!("Must be at least {}", self.min)
        } else if self.min_exclusive {
            format!("Must be greater than {} and at most {}", self.min, self.max)
        } else {
            format!("Must be between {} and {}", self.min, self.max)
        }
    }
}

pub fn number(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<f64>,
    bounds: Bounds,
) -> Option<f64> {
    let value = raw?;
    if !bounds.admits(value) {
        errors.push(field, bounds.describe());
        return None;
    }
    Some(value)
}

pub fn integer(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<f64>,
    min: i32,
    max: i32,
) -> Option<i32> {
    let value = raw?;
    if value.fract() != 0.0 {
        errors.push(field, "Must be an integer");
        return None;
    }
    if value < f64::from(min) || value > f64::from(max) {
        errors.push(field, format!("Must be between {min} and {max}"));
        return None;
    }
    Some(value as i32)
}

/// Validates a field only when the request carried it.
///
/// `None` leaves the stored value alone; `Some(None)` clears it.
pub fn changed<I, T>(
    raw: Option<I>,
    check: impl FnOnce(Option<I>) -> Option<T>,
) -> Option<Option<T>> {
    raw.map(|value| check(Some(value)))
}

/// Query-string booleans (`?is_primary=true`).
pub fn flag(errors: &mut FieldErrors, field: &str, raw: Option<&String>) -> Option<bool> {
    match raw.map(|value| value.trim()) {
        None | Some("") => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(other) => {
            errors.push(field, format!("Invalid value '{other}'"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_trims_and_enforces_presence() {
        let mut errors = FieldErrors::default();
        assert_eq!(
            text(&mut errors, "allergen", Some("  Peanuts ".into()), Presence::Required, 200),
            Some("Peanuts".to_owned())
        );
        assert!(errors.is_empty());

        assert_eq!(text(&mut errors, "allergen", Some("   ".into()), Presence::Required, 200), None);
        assert_eq!(text(&mut errors, "reaction", None, Presence::Optional, 10), None);
        assert_eq!(text(&mut errors, "notes", Some("  ".into()), Presence::Optional, 10), None);
        assert_eq!(text(&mut errors, "name", None, Presence::Required, 10), None);
        assert!(errors.contains("allergen"));
        assert!(errors.contains("name"));
        assert!(!errors.contains("reaction"));
        assert!(!errors.contains("notes"));
    }

    #[test]
    fn non_empty_allows_absence_only() {
        let mut errors = FieldErrors::default();
        assert_eq!(text(&mut errors, "allergen", None, Presence::NonEmpty, 200), None);
        assert!(errors.is_empty());
        text(&mut errors, "allergen", Some(String::new()), Presence::NonEmpty, 200);
        assert!(errors.contains("allergen"));
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        let mut errors = FieldErrors::default();
        let parsed = timestamp(&mut errors, "scheduled_time", Some("2024-05-01T08:00:00+02:00".into()));
        assert_eq!(parsed.map(|at| at.to_rfc3339()).as_deref(), Some("2024-05-01T06:00:00+00:00"));
        assert!(timestamp(&mut errors, "actual_time", Some("08:00".into())).is_none());
        assert!(errors.contains("actual_time"));
    }

    #[test]
    fn required_dates_report_absence() {
        let mut errors = FieldErrors::default();
        assert!(date_with(&mut errors, "sleep_date", None, Presence::Required).is_none());
        assert!(errors.contains("sleep_date"));
        assert!(date(&mut errors, "first_observed", None).is_none());
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn lower_bound_only() {
        let mut errors = FieldErrors::default();
        assert_eq!(number(&mut errors, "rem_minutes", Some(0.0), Bounds::at_least(0.0)), Some(0.0));
        assert!(number(&mut errors, "rem_minutes", Some(-1.0), Bounds::at_least(0.0)).is_none());
        let message = errors.iter().next().map(|error| error.message.clone());
        assert_eq!(message.as_deref(), Some("Must be at least 0"));
    }

    #[test]
    fn length_is_counted_in_characters() {
        let mut errors = FieldErrors::default();
        assert!(text(&mut errors, "name", Some("é".repeat(5)), Presence::Required, 5).is_some());
        assert!(text(&mut errors, "name", Some("é".repeat(6)), Presence::Required, 5).is_none());
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn dates_must_be_calendar_days() {
        let mut errors = FieldErrors::default();
        assert_eq!(
            date(&mut errors, "first_observed", Some("2024-02-29".into())),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(date(&mut errors, "first_observed", Some("2023-02-29".into())), None);
        assert!(errors.contains("first_observed"));
    }

    #[test]
    fn email_and_phone_formats() {
        let mut errors = FieldErrors::default();
        assert!(email(&mut errors, "email", Some("nurse@clinic.org".into()), Presence::Optional).is_some());
        assert!(phone(&mut errors, "phone", Some("+27 (82) 555-0101".into()), Presence::Required).is_some());
        assert!(errors.is_empty());

        email(&mut errors, "email", Some("not-an-email".into()), Presence::Optional);
        phone(&mut errors, "phone", Some("call me".into()), Presence::Required);
        assert!(errors.contains("email"));
        assert!(errors.contains("phone"));
    }

    #[test]
    fn numeric_bounds() {
        let mut errors = FieldErrors::default();
        assert_eq!(number(&mut errors, "heart_rate", Some(72.0), Bounds::positive(300.0)), Some(72.0));
        assert_eq!(number(&mut errors, "heart_rate", Some(0.0), Bounds::positive(300.0)), None);
        assert_eq!(number(&mut errors, "temperature", Some(30.0), Bounds::range(30.0, 50.0)), Some(30.0));
        assert_eq!(number(&mut errors, "temperature", Some(51.0), Bounds::range(30.0, 50.0)), None);
        assert_eq!(integer(&mut errors, "age_at_onset", Some(42.5), 0, 150), None);
        assert_eq!(integer(&mut errors, "age_at_onset", Some(42.0), 0, 150), Some(42));
        assert_eq!(errors.iter().count(), 3);
    }

    #[test]
    fn changed_distinguishes_absent_from_cleared() {
        let mut errors = FieldErrors::default();
        let absent = changed(None, |raw| text(&mut errors, "notes", raw, Presence::Optional, 10));
        assert_eq!(absent, None);
        let cleared = changed(Some(" ".to_owned()), |raw| text(&mut errors, "notes", raw, Presence::Optional, 10));
        assert_eq!(cleared, Some(None));
        let set = changed(Some("x".to_owned()), |raw| text(&mut errors, "notes", raw, Presence::Optional, 10));
        assert_eq!(set, Some(Some("x".to_owned())));
        assert!(errors.is_empty());
    }

    #[test]
    fn query_flags() {
        let mut errors = FieldErrors::default();
        assert_eq!(flag(&mut errors, "is_primary", Some(&"true".to_owned())), Some(true));
        assert_eq!(flag(&mut errors, "is_primary", None), None);
        assert_eq!(flag(&mut errors, "is_primary", Some(&"yes".to_owned())), None);
        assert!(errors.contains("is_primary"));
    }
}
