//! Form definition and the field validation loop.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::FormConfig;
use crate::error::{FormError, Result, ValidationErrors};
use crate::evaluator::{evaluate, Outcome, RuleContext};
use crate::guard::{self, SubmissionStore, CSRF_FIELD, SUBMISSION_ID_FIELD};
use crate::rules::{Choices, ErrorCode, Rule, RuleKind};
use crate::source::{DataSource, Lookup};

/// Values accepted during a validation pass, keyed by field name.
pub type FormData = HashMap<String, String>;

/// Hook run after every field was checked. It may add further errors.
pub type VerifyHook = Arc<dyn Fn(&FormData, &mut ValidationErrors) + Send + Sync>;

/// Rules declared for one field.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    Single(Rule),
    /// Evaluated in order; stops after a rule lets an empty value through.
    Chain(Vec<Rule>),
}

impl FieldSpec {
    /// Returns the rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        match self {
            Self::Single(rule) => std::slice::from_ref(rule),
            Self::Chain(rules) => rules,
        }
    }

    /// Returns whether the field may be left out or empty.
    pub fn tolerates_empty(&self) -> bool {
        self.rules().iter().any(Rule::tolerates_empty)
    }
}

impl From<Rule> for FieldSpec {
    fn from(rule: Rule) -> Self {
        Self::Single(rule)
    }
}

impl From<RuleKind> for FieldSpec {
    fn from(kind: RuleKind) -> Self {
        Self::Single(Rule::new(kind))
    }
}

impl From<Vec<Rule>> for FieldSpec {
    fn from(rules: Vec<Rule>) -> Self {
        Self::Chain(rules)
    }
}

/// Trait for form types that declare their fields in code.
pub trait FormSchema: Send + Sync {
    /// Returns the form name, also used as the submit button name.
    fn name(&self) -> &str;

    /// Returns the fields in declaration order.
    fn fields(&self) -> Vec<(String, FieldSpec)>;

    /// Cross-field checks run after the per-field rules.
    fn verify(&self, _data: &FormData, _errors: &mut ValidationErrors) {}
}

/// A form: declared fields plus the state of the latest validation pass.
pub struct Form {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) fields: Vec<(String, FieldSpec)>,
    pub(crate) lists: HashMap<String, Choices>,
    pub(crate) config: FormConfig,
    pub(crate) check_csrf: bool,
    pub(crate) prevent_duplicates: bool,
    verify: Option<VerifyHook>,
    pub(crate) data: FormData,
    pub(crate) errors: ValidationErrors,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("fields", &self.fields)
            .field("check_csrf", &self.check_csrf)
            .field("prevent_duplicates", &self.prevent_duplicates)
            .field("data", &self.data)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Form {
    /// Creates an empty form with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields: Vec::new(),
            lists: HashMap::new(),
            config: FormConfig::default(),
            check_csrf: true,
            prevent_duplicates: false,
            verify: None,
            data: FormData::new(),
            errors: ValidationErrors::new(),
        }
    }

    /// Creates a form from a [`FormSchema`], wiring its `verify` as the hook.
    pub fn from_schema<S: FormSchema + 'static>(schema: S) -> Self {
        let schema = Arc::new(schema);
        let mut form = Self::new(schema.name());
        form.fields = schema.fields();
        form.verify = Some(Arc::new(
            move |data: &FormData, errors: &mut ValidationErrors| schema.verify(data, errors),
        ));
        form
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    /// Nests every field under `namespace` in submitted data and rendered names.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.push((name.into(), spec.into()));
        self
    }

    /// Attaches list data for membership rules and selects.
    #[must_use]
    pub fn list(mut self, name: impl Into<String>, choices: impl Into<Choices>) -> Self {
        self.add_list_data(name, choices);
        self
    }

    /// Skips the CSRF field even when a token is configured.
    #[must_use]
    pub fn no_csrf(mut self) -> Self {
        self.check_csrf = false;
        self
    }

    /// Adds the duplicate-submission guard field.
    #[must_use]
    pub fn prevent_duplicates(mut self) -> Self {
        self.prevent_duplicates = true;
        self
    }

    /// Sets the post-validation hook.
    #[must_use]
    pub fn verify<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FormData, &mut ValidationErrors) + Send + Sync + 'static,
    {
        self.verify = Some(Arc::new(hook));
        self
    }

    /// Attaches list data for `name`, replacing any previous list.
    pub fn add_list_data(&mut self, name: impl Into<String>, choices: impl Into<Choices>) {
        self.lists.insert(name.into(), choices.into());
    }

    /// Returns the list data attached to `name`.
    pub fn list_data(&self, name: &str) -> Option<&Choices> {
        self.lists.get(name)
    }

    /// Returns the form name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace the fields are nested under, if any.
    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the declared fields in order, without the guard fields.
    pub fn fields(&self) -> &[(String, FieldSpec)] {
        &self.fields
    }

    /// Returns the configuration.
    pub fn form_config(&self) -> &FormConfig {
        &self.config
    }

    /// Values accepted by the latest pass.
    pub fn data(&self) -> &FormData {
        &self.data
    }

    /// Errors raised by the latest pass.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Records an error against `field`.
    pub fn invalidate(&mut self, field: &str, code: ErrorCode) {
        self.errors.invalidate(field, code);
    }

    /// Returns whether the latest pass recorded any error.
    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    /// Returns whether `field` has an error, or the given one.
    pub fn field_has_error(&self, field: &str, code: Option<&ErrorCode>) -> bool {
        self.errors.field_has_error(field, code)
    }

    /// Validates `source` against the declared fields.
    ///
    /// Returns the accepted values when no field failed. The values and errors
    /// also stay on the form for re-rendering. `store` backs the
    /// duplicate-submission guard; without one the guard is skipped.
    pub fn validate(
        &mut self,
        source: &dyn DataSource,
        mut store: Option<&mut dyn SubmissionStore>,
    ) -> Result<FormData> {
        self.data.clear();
        self.errors.clear();

        let mut guards: Vec<(&str, FieldSpec)> = Vec::new();
        if self.check_csrf {
            if let Some(token) = self.config.active_csrf_token() {
                guards.push((CSRF_FIELD, guard::csrf_rules(token).into()));
            }
        }
        let check_duplicates = self.prevent_duplicates && store.is_some();
        if check_duplicates {
            guards.push((SUBMISSION_ID_FIELD, guard::submission_id_rules().into()));
        } else if self.prevent_duplicates {
            debug!(form = %self.name, "no submission store, duplicate guard skipped");
        }

        debug!(
            form = %self.name,
            fields = guards.len() + self.fields.len(),
            "validating form"
        );

        let namespace = self.namespace.as_deref();
        let submissions = store.as_deref();
        let fields = guards
            .iter()
            .map(|(name, spec)| (*name, spec))
            .chain(self.fields.iter().map(|(name, spec)| (name.as_str(), spec)));

        for (name, spec) in fields {
            let value = match source.lookup(namespace, name) {
                Lookup::Text(value) => value,
                Lookup::File => {
                    trace!(field = name, "skipping file upload");
                    continue;
                }
                Lookup::Absent => {
                    if !spec.tolerates_empty() {
                        self.errors.invalidate(name, ErrorCode::Missing);
                    }
                    continue;
                }
            };

            self.data.insert(name.to_string(), value.to_string());

            for rule in spec.rules() {
                let ctx = RuleContext {
                    data: &self.data,
                    lists: &self.lists,
                    errors: &self.errors,
                    submissions,
                };
                match evaluate(rule, value, name, &ctx) {
                    Outcome::Pass => {}
                    Outcome::EmptyOk => break,
                    Outcome::Fail(code) => self.errors.invalidate(name, code),
                }
            }
        }

        if check_duplicates && !self.errors.field_has_error(SUBMISSION_ID_FIELD, None) {
            if let (Some(store), Some(id)) =
                (store.as_deref_mut(), self.data.get(SUBMISSION_ID_FIELD))
            {
                store.record(id);
            }
        }

        if let Some(verify) = &self.verify {
            verify(&self.data, &mut self.errors);
        }

        if self.errors.has_errors() {
            debug!(form = %self.name, fields = self.errors.len(), "validation failed");
            Err(FormError::ValidationErrors(self.errors.clone()))
        } else {
            debug!(form = %self.name, "validation passed");
            Ok(self.data.clone())
        }
    }

    /// Checks only the CSRF token, without running the other rules.
    pub fn validate_csrf(&self, source: &dyn DataSource) -> bool {
        match (
            self.config.active_csrf_token(),
            source.lookup(self.namespace.as_deref(), CSRF_FIELD),
        ) {
            (Some(token), Lookup::Text(value)) => value == token,
            _ => false,
        }
    }

    /// Returns whether a request carried a submission.
    pub fn has_posted(&self, method: &str, source: &dyn DataSource) -> bool {
        method.eq_ignore_ascii_case("POST") || !source.is_empty()
    }

    /// Returns whether this form's submit button was part of the submission.
    pub fn is_me(&self, method: &str, source: &dyn DataSource) -> bool {
        self.has_posted(method, source)
            && !matches!(
                source.lookup(self.namespace.as_deref(), &self.name),
                Lookup::Absent
            )
    }
}
