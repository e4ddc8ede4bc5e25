//! Field checks shared by the create/update handlers. Each check records its
//! message in a [`FieldErrors`] so one response can report every bad field.

use serde::{Deserialize, Deserializer};
use time::{macros::format_description, Date};
use uuid::Uuid;

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const TITLE_MAX_CHARS: usize = 255;

/// Trimmed title; records an error when absent, blank or too long.
pub fn required_title(errors: &mut FieldErrors, raw: Option<&str>) -> String {
    match raw {
        None => {
            errors.add("title", REQUIRED);
            String::new()
        }
        Some(raw) => title(errors, raw),
    }
}

/// Title from a body that tells an explicit `null` apart from a missing key.
/// Returns `None` only when the key is missing and `keep_missing` is set.
pub fn nullable_title(
    errors: &mut FieldErrors,
    raw: Option<Option<&str>>,
    keep_missing: bool,
) -> Option<String> {
    match raw {
        None if keep_missing => None,
        None => Some(required_title(errors, None)),
        Some(None) => {
            errors.add("title", NULL);
            Some(String::new())
        }
        Some(Some(raw)) => Some(title(errors, raw)),
    }
}

pub fn title(errors: &mut FieldErrors, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add("title", BLANK);
    } else if trimmed.chars().count() > TITLE_MAX_CHARS {
        errors.add(
            "title",
            format!("Ensure this field has no more than {TITLE_MAX_CHARS} characters."),
        );
    }
    trimmed.to_string()
}

/// A required reference to another row, given as a UUID string.
pub fn required_ref(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<Uuid> {
    let Some(raw) = raw else {
        errors.add(field, REQUIRED);
        return None;
    };
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, "Must be a valid UUID.");
            None
        }
    }
}

/// Serde helper: an absent key stays `None` (via `#[serde(default)]`) and an
/// explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// `YYYY-MM-DD`.
pub fn parse_date(field: &str, raw: &str, errors: &mut FieldErrors) -> Option<Date> {
    match Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")) {
        Ok(d) => Some(d),
        Err(_) => {
            errors.add(
                field,
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            );
            None
        }
    }
}
