//! Request validation helpers.
//!
//! Field checks push into a shared `ValidationBuilder` so a form reports all
//! of its problems at once instead of the first one.

use crate::error::ValidationBuilder;

/// String validation helpers
pub mod string {
    use super::*;

    /// Trimmed non-empty value, or a field error
    pub fn required(
        value: Option<&str>,
        field: &str,
        message: &str,
        errors: &mut ValidationBuilder,
    ) -> Option<String> {
        match value.map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            _ => {
                errors.push(field, message);
                None
            }
        }
    }

    /// Validate optional string with max length
    pub fn max_length(value: Option<&str>, field: &str, max: usize, errors: &mut ValidationBuilder) {
        if let Some(s) = value {
            if s.chars().count() > max {
                errors.push(field, &format!("{} must be {} characters or less", field, max));
            }
        }
    }

    /// Trim, mapping blank input to `None`
    pub fn optional(value: Option<String>) -> Option<String> {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Case-insensitive substring search over a record's text fields.
#[derive(Debug, Clone, Default)]
pub struct Search {
    needle: Option<String>,
}

impl Search {
    pub fn new(query: Option<&str>) -> Self {
        Self {
            needle: query
                .map(|q| q.trim().to_lowercase())
                .filter(|q| !q.is_empty()),
        }
    }

    /// True when there is no query, or any field contains it
    pub fn matches<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => fields
                .into_iter()
                .any(|field| field.to_lowercase().contains(needle)),
        }
    }
}
