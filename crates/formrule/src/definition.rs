//! Declarative form definitions loaded from JSON files.
//!
//! A definition lists fields in order, each with one rule or a chain of
//! rules. A rule is either a bare kind name or an object with a `kind` and
//! its parameters:
//!
//! ```json
//! {
//!     "name": "signup",
//!     "prevent_duplicates": true,
//!     "lists": {"plan": ["free", "pro"]},
//!     "fields": [
//!         {"name": "email", "rules": ["not_empty", "email"]},
//!         {"name": "website", "rules": ["empty", "url"]},
//!         {"name": "plan", "rules": "in_list"},
//!         {"name": "username", "rules": {"kind": "length", "min": 3, "max": 20}}
//!     ]
//! }
//! ```
//!
//! Custom rules name a callback registered in a [`CallbackRegistry`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::FormConfig;
use crate::error::{FormError, Result};
use crate::form::{FieldSpec, Form};
use crate::rules::{Callback, Choices, ErrorCode, Rule, RuleKind, RuleParams};

/// File suffix of definition files.
pub const DEFINITION_SUFFIX: &str = ".form.json";

/// A list given as plain values or as `[key, label]` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListDef {
    Values(Vec<String>),
    Pairs(Vec<(String, String)>),
}

impl From<ListDef> for Choices {
    fn from(list: ListDef) -> Self {
        match list {
            ListDef::Values(values) => Self::from_values(values),
            ListDef::Pairs(pairs) => Self::from_pairs(pairs),
        }
    }
}

/// A rule with parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleParamsDef {
    pub kind: String,
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
    #[serde(default)]
    pub list: Option<ListDef>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub use_keys: bool,
    #[serde(default)]
    pub always_run: bool,
    /// Extra parameters handed to custom callbacks.
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// A rule as written in a definition file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleDef {
    Bare(String),
    Full(RuleParamsDef),
}

/// One rule or a chain of rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RulesDef {
    // Tried first: a rule object can also be read from a JSON array.
    Chain(Vec<RuleDef>),
    Single(RuleDef),
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    pub rules: RulesDef,
}

/// A whole form as written in a definition file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormDefinition {
    /// Defaults to the name the form was loaded under.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub no_csrf: bool,
    #[serde(default)]
    pub prevent_duplicates: bool,
    #[serde(default)]
    pub lists: HashMap<String, ListDef>,
    pub fields: Vec<FieldDef>,
}

/// Named callbacks available to custom rules in definitions.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Callback>,
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.callbacks.keys().collect();
        names.sort();
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &names)
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `name`, replacing any previous one.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str, &RuleParams) -> bool + Send + Sync + 'static,
    {
        self.callbacks.insert(name.into(), Arc::new(callback));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name)
    }
}

impl RuleDef {
    /// Builds the rule, resolving callbacks and compiling patterns.
    pub fn to_rule(&self, field: &str, registry: &CallbackRegistry) -> Result<Rule> {
        match self {
            Self::Bare(kind) => {
                let kind: RuleKind = kind.parse()?;
                check_params(field, kind, &Rule::new(kind).params)?;
                Ok(Rule::new(kind))
            }
            Self::Full(def) => {
                let kind: RuleKind = def.kind.parse()?;
                let mut rule = match &def.pattern {
                    Some(pattern) if kind == RuleKind::MatchRegex => Rule::match_regex(pattern)?,
                    _ => Rule::new(kind),
                };
                let params = &mut rule.params;
                params.min = def.min;
                params.max = def.max;
                params.list = def.list.clone().map(Choices::from);
                params.field = def.field.clone();
                params.error_code = def.error_code.as_deref().map(ErrorCode::custom);
                params.use_keys = def.use_keys;
                params.always_run = def.always_run;
                params.extra = def.params.clone();
                if let Some(name) = &def.callback {
                    let callback = registry
                        .get(name)
                        .ok_or_else(|| FormError::UnknownCallback(name.clone()))?;
                    params.callback = Some(Arc::clone(callback));
                }
                check_params(field, kind, &rule.params)?;
                Ok(rule)
            }
        }
    }
}

fn check_params(field: &str, kind: RuleKind, params: &RuleParams) -> Result<()> {
    let missing = match kind {
        RuleKind::MatchField if params.field.is_none() => Some("field"),
        RuleKind::MatchRegex if params.pattern.is_none() => Some("pattern"),
        RuleKind::Custom if params.callback.is_none() => Some("callback"),
        _ => None,
    };
    match missing {
        Some(param) => Err(FormError::InvalidRule(format!(
            "{kind} rule on field {field} needs a {param}"
        ))),
        None => Ok(()),
    }
}

impl FormDefinition {
    /// Parses a definition from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Builds a [`Form`] named `default_name` unless the definition names itself.
    pub fn into_form(
        self,
        default_name: &str,
        registry: &CallbackRegistry,
        config: &FormConfig,
    ) -> Result<Form> {
        let name = self.name.unwrap_or_else(|| default_name.to_string());
        let mut form = Form::new(name).config(config.clone());

        if let Some(namespace) = self.namespace {
            form = form.namespace(namespace);
        }
        if self.no_csrf {
            form = form.no_csrf();
        }
        if self.prevent_duplicates {
            form = form.prevent_duplicates();
        }
        for (list_name, list) in self.lists {
            form.add_list_data(list_name, list);
        }

        for field in self.fields {
            let spec = match &field.rules {
                RulesDef::Single(rule) => FieldSpec::Single(rule.to_rule(&field.name, registry)?),
                RulesDef::Chain(rules) => FieldSpec::Chain(
                    rules
                        .iter()
                        .map(|rule| rule.to_rule(&field.name, registry))
                        .collect::<Result<Vec<_>>>()?,
                ),
            };
            form = form.field(field.name, spec);
        }

        Ok(form)
    }
}

/// Returns the path of the definition file for `name` inside `dir`.
pub fn definition_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{DEFINITION_SUFFIX}"))
}

/// Loads the form `name` from `config.forms_dir`.
pub fn load_form(name: &str, registry: &CallbackRegistry, config: &FormConfig) -> Result<Form> {
    let path = definition_path(&config.forms_dir, name);
    if !path.is_file() {
        return Err(FormError::FormNotFound(path));
    }

    debug!(path = %path.display(), "reading form definition");
    let text = std::fs::read_to_string(&path)?;
    let definition =
        FormDefinition::from_json(&text).map_err(|source| FormError::Definition {
            path: path.clone(),
            source,
        })?;

    let form = definition.into_form(name, registry, config)?;
    info!(form = %form.name(), fields = form.fields().len(), "loaded form definition");
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_shapes() {
        let def = FormDefinition::from_json(
            r#"{
                "fields": [
                    {"name": "a", "rules": "email"},
                    {"name": "b", "rules": ["empty", {"kind": "length", "max": 4}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(def.fields[0].rules, RulesDef::Single(RuleDef::Bare("email".into())));
        let RulesDef::Chain(chain) = &def.fields[1].rules else {
            panic!("expected a chain");
        };
        assert_eq!(chain.len(), 2);
        assert!(matches!(&chain[1], RuleDef::Full(p) if p.max == Some(4)));
    }

    #[test]
    fn test_list_shapes() {
        let values: ListDef = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        let pairs: ListDef = serde_json::from_str(r#"[["au", "Australia"]]"#).unwrap();
        assert!(Choices::from(values).contains("b", false));
        assert!(Choices::from(pairs).contains("au", true));
    }

    #[test]
    fn test_unknown_rule_kind_is_rejected() {
        let rule = RuleDef::Bare("phone".into());
        let err = rule.to_rule("f", &CallbackRegistry::new()).unwrap_err();
        assert!(matches!(err, FormError::UnknownRule(name) if name == "phone"));
    }

    #[test]
    fn test_custom_rule_needs_registered_callback() {
        let rule = RuleDef::Full(RuleParamsDef {
            kind: "custom".into(),
            callback: Some("is_even".into()),
            ..RuleParamsDef::default()
        });
        let err = rule.to_rule("n", &CallbackRegistry::new()).unwrap_err();
        assert!(matches!(err, FormError::UnknownCallback(name) if name == "is_even"));

        let registry = CallbackRegistry::new()
            .register("is_even", |v, _| v.parse::<i64>().is_ok_and(|n| n % 2 == 0));
        let built = rule.to_rule("n", &registry).unwrap();
        assert_eq!(built.kind, RuleKind::Custom);
        assert!(built.params.callback.is_some());
    }

    #[test]
    fn test_missing_required_params() {
        let registry = CallbackRegistry::new();
        for kind in ["match_field", "match_regex", "custom"] {
            let err = RuleDef::Bare(kind.into()).to_rule("f", &registry).unwrap_err();
            assert!(matches!(err, FormError::InvalidRule(_)), "{kind}");
        }
    }

    #[test]
    fn test_bad_pattern() {
        let rule = RuleDef::Full(RuleParamsDef {
            kind: "match_regex".into(),
            pattern: Some("(".into()),
            ..RuleParamsDef::default()
        });
        assert!(matches!(
            rule.to_rule("f", &CallbackRegistry::new()),
            Err(FormError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_into_form() {
        let def = FormDefinition::from_json(
            r#"{
                "namespace": "signup",
                "no_csrf": true,
                "prevent_duplicates": true,
                "lists": {"plan": ["free", "pro"]},
                "fields": [
                    {"name": "email", "rules": ["not_empty", "email"]},
                    {"name": "plan", "rules": "in_list"}
                ]
            }"#,
        )
        .unwrap();
        let form = def
            .into_form("signup", &CallbackRegistry::new(), &FormConfig::new())
            .unwrap();
        assert_eq!(form.name(), "signup");
        assert_eq!(form.namespace_name(), Some("signup"));
        assert_eq!(form.fields().len(), 2);
        assert!(form.list_data("plan").is_some());
    }

    #[test]
    fn test_definition_path() {
        assert_eq!(
            definition_path(Path::new("forms"), "login"),
            PathBuf::from("forms/login.form.json")
        );
    }
}
