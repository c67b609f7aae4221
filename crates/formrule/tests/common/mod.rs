#![allow(dead_code)]

use formrule::{ErrorCode, Form, FormData, FormError, SubmittedData, ValidationErrors};

pub fn submitted(pairs: &[(&str, &str)]) -> SubmittedData {
    SubmittedData::from_pairs(pairs.iter().copied())
}

pub fn validate_ok(form: &mut Form, pairs: &[(&str, &str)]) -> FormData {
    form.validate(&submitted(pairs), None)
        .unwrap_or_else(|e| panic!("Expected {pairs:?} to validate\nError: {e}"))
}

pub fn validate_err(form: &mut Form, pairs: &[(&str, &str)]) -> ValidationErrors {
    match form.validate(&submitted(pairs), None) {
        Err(FormError::ValidationErrors(errors)) => errors,
        other => panic!("Expected validation errors for {pairs:?}, got {other:?}"),
    }
}

pub fn codes(errors: &ValidationErrors, field: &str) -> Vec<String> {
    errors
        .get(field)
        .unwrap_or_default()
        .iter()
        .map(ErrorCode::to_string)
        .collect()
}
