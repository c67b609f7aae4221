//! Error types for forms.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::rules::ErrorCode;

/// Form-specific errors.
#[derive(Debug, Error)]
pub enum FormError {
    /// Validation failed with errors.
    #[error("validation errors: {0}")]
    ValidationErrors(ValidationErrors),

    /// A rule definition names a rule kind that does not exist.
    #[error("unknown rule kind: {0}")]
    UnknownRule(String),

    /// A custom rule references a callback that was never registered.
    #[error("unknown callback: {0}")]
    UnknownCallback(String),

    /// A rule definition is incomplete or inconsistent.
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// A regex rule carries a pattern that does not compile.
    #[error("invalid pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No definition file exists for the requested form.
    #[error("form definition not found: {0}")]
    FormNotFound(PathBuf),

    /// A definition file could not be decoded.
    #[error("invalid form definition {path}: {source}")]
    Definition {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error while reading a definition file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Form data parsing error.
    #[error("failed to parse form data: {0}")]
    ParseError(String),
}

/// Collection of validation error codes by field.
///
/// Codes are only ever appended; a field keeps every code raised against it
/// in the order the rules ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: HashMap<String, Vec<ErrorCode>>,
}

impl ValidationErrors {
    /// Creates a new empty ValidationErrors.
    pub fn new() -> Self {
        Self {
            errors: HashMap::new(),
        }
    }

    /// Records `code` against `field`.
    pub fn invalidate(&mut self, field: &str, code: ErrorCode) {
        self.errors.entry(field.to_string()).or_default().push(code);
    }

    /// Returns whether any field has an error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns whether `field` has an error, or a specific one when `code` is given.
    pub fn field_has_error(&self, field: &str, code: Option<&ErrorCode>) -> bool {
        match (self.errors.get(field), code) {
            (Some(codes), Some(code)) => codes.contains(code),
            (Some(codes), None) => !codes.is_empty(),
            (None, _) => false,
        }
    }

    /// Returns whether there are no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of fields with errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns errors for a specific field.
    pub fn get(&self, field: &str) -> Option<&[ErrorCode]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Returns all errors as a flat list.
    pub fn all_errors(&self) -> Vec<(&str, &ErrorCode)> {
        self.errors
            .iter()
            .flat_map(|(field, codes)| codes.iter().map(move |code| (field.as_str(), code)))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.errors.clear();
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, codes) in fields {
            for code in codes {
                writeln!(f, "{field}: {code}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_collects_codes() {
        let mut errors = ValidationErrors::new();
        errors.invalidate("email", ErrorCode::InvalidEmail);
        errors.invalidate("email", ErrorCode::TooShort);

        assert!(errors.has_errors());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("email"),
            Some(&[ErrorCode::InvalidEmail, ErrorCode::TooShort][..])
        );
    }

    #[test]
    fn test_field_has_error() {
        let mut errors = ValidationErrors::new();
        errors.invalidate("name", ErrorCode::TooLong);

        assert!(errors.field_has_error("name", None));
        assert!(errors.field_has_error("name", Some(&ErrorCode::TooLong)));
        assert!(!errors.field_has_error("name", Some(&ErrorCode::TooShort)));
        assert!(!errors.field_has_error("other", None));
    }

    #[test]
    fn test_custom_codes_compare_by_name() {
        let mut errors = ValidationErrors::new();
        errors.invalidate("uuid", ErrorCode::custom("used"));

        assert!(errors.field_has_error("uuid", Some(&ErrorCode::custom("used"))));
        assert!(!errors.field_has_error("uuid", Some(&ErrorCode::custom("taken"))));
    }

    #[test]
    fn test_display_sorted_by_field() {
        let mut errors = ValidationErrors::new();
        errors.invalidate("b", ErrorCode::Missing);
        errors.invalidate("a", ErrorCode::NotANumber);

        assert_eq!(errors.to_string(), "a: number\nb: missing\n");
    }

    #[test]
    fn test_all_errors() {
        let mut errors = ValidationErrors::new();
        errors.invalidate("a", ErrorCode::Missing);
        errors.invalidate("a", ErrorCode::NotInList);

        assert_eq!(errors.all_errors().len(), 2);
        errors.clear();
        assert!(errors.is_empty());
    }
}
