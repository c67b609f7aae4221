//! Form configuration shared by validation and rendering.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

/// Default class added to controls whose field failed validation.
pub const DEFAULT_CSS_ERROR_CLASS: &str = "Error";

/// Settings applied to every form built with them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Class appended to a control's `class` attribute when its field has errors.
    pub css_error_class: String,
    /// Expected CSRF token. `None` or an empty token disables the CSRF field.
    #[serde(deserialize_with = "non_empty_token")]
    pub csrf_token: Option<String>,
    /// Directory searched by [`crate::definition::load_form`].
    pub forms_dir: PathBuf,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            css_error_class: DEFAULT_CSS_ERROR_CLASS.to_string(),
            csrf_token: None,
            forms_dir: PathBuf::from("./forms"),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected CSRF token. An empty token disables the check.
    #[must_use]
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.csrf_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Returns the token the CSRF field must carry, if the check is enabled.
    pub fn active_csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Sets the error class.
    #[must_use]
    pub fn css_error_class(mut self, class: impl Into<String>) -> Self {
        self.css_error_class = class.into();
        self
    }

    /// Sets the definitions directory.
    #[must_use]
    pub fn forms_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.forms_dir = dir.into();
        self
    }
}

fn non_empty_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let token = Option::<String>::deserialize(deserializer)?;
    Ok(token.filter(|token| !token.is_empty()))
}
