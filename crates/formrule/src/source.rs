//! Submitted request data.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{FormError, Result};

/// A value found in the submitted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Nothing was submitted under the name.
    Absent,
    /// A plain text value.
    Text(&'a str),
    /// The name refers to an uploaded file.
    File,
}

/// Read access to a submitted payload.
pub trait DataSource {
    /// Looks up `field`, nested under `namespace` when one is given.
    fn lookup(&self, namespace: Option<&str>, field: &str) -> Lookup<'_>;

    /// Returns whether nothing was submitted.
    fn is_empty(&self) -> bool;
}

impl DataSource for HashMap<String, String> {
    fn lookup(&self, namespace: Option<&str>, field: &str) -> Lookup<'_> {
        match namespace {
            Some(_) => Lookup::Absent,
            None => self
                .get(field)
                .map_or(Lookup::Absent, |v| Lookup::Text(v.as_str())),
        }
    }

    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }
}

/// One submitted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedValue {
    Text(String),
    /// File-upload marker; the content is handled elsewhere.
    File,
}

/// Submitted form payload keyed by field name, with optional namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedData {
    fields: HashMap<String, SubmittedValue>,
    namespaces: HashMap<String, HashMap<String, SubmittedValue>>,
}

impl SubmittedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds data from `name=value` pairs. Names of the form `ns[field]` are nested.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut data = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            match split_nested(key) {
                Some((namespace, field)) => data.insert_nested(namespace, field, value),
                None => data.insert(key, value),
            }
        }
        data
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(body.as_bytes()).into_owned())
    }

    /// Converts a JSON object. Scalars become text, objects become namespaces,
    /// `null` is treated as not submitted.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(FormError::ParseError(
                "submitted data must be a JSON object".to_string(),
            ));
        };

        let mut data = Self::new();
        for (key, value) in map {
            if let Value::Object(inner) = value {
                for (field, value) in inner {
                    if let Some(text) = json_text(field, value)? {
                        data.insert_nested(key.as_str(), field.as_str(), text);
                    }
                }
            } else if let Some(text) = json_text(key, value)? {
                data.insert(key.as_str(), text);
            }
        }
        Ok(data)
    }

    /// Sets a top-level text value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(field.into(), SubmittedValue::Text(value.into()));
    }

    /// Sets a text value nested under `namespace`.
    pub fn insert_nested(
        &mut self,
        namespace: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .insert(field.into(), SubmittedValue::Text(value.into()));
    }

    /// Marks `field` as an uploaded file.
    pub fn insert_file(&mut self, namespace: Option<&str>, field: impl Into<String>) {
        let target = match namespace {
            Some(ns) => self.namespaces.entry(ns.to_string()).or_default(),
            None => &mut self.fields,
        };
        target.insert(field.into(), SubmittedValue::File);
    }

    /// Returns the top-level entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<&SubmittedValue> {
        self.fields.get(key)
    }
}

impl DataSource for SubmittedData {
    fn lookup(&self, namespace: Option<&str>, field: &str) -> Lookup<'_> {
        let entry = match namespace {
            Some(ns) => self.namespaces.get(ns).and_then(|map| map.get(field)),
            None => self.fields.get(field),
        };
        match entry {
            Some(SubmittedValue::Text(text)) => Lookup::Text(text),
            Some(SubmittedValue::File) => Lookup::File,
            None => Lookup::Absent,
        }
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.namespaces.is_empty()
    }
}

fn split_nested(key: &str) -> Option<(&str, &str)> {
    let inner = key.strip_suffix(']')?;
    let (namespace, field) = inner.split_once('[')?;
    if namespace.is_empty() || field.is_empty() || field.contains('[') {
        return None;
    }
    Some((namespace, field))
}

fn json_text(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(FormError::ParseError(format!(
            "field {key} must hold a scalar value"
        ))),
    }
}
