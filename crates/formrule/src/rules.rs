//! Rule catalog: rule kinds, their parameters and the error codes they raise.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{FormError, Result};

/// Kinds of validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Keeps a field in the submitted data without checking it.
    DoNothing,
    /// Lets an empty value through and stops the rest of the chain.
    Empty,
    /// Rejects an empty value.
    NotEmpty,
    /// Integer values only.
    Number,
    /// Placeholder; never fails.
    String,
    /// Email addresses.
    Email,
    /// IANA timezone identifiers.
    Timezone,
    /// Absolute URLs with a scheme.
    Url,
    /// Character count within optional `min` / `max` bounds.
    Length,
    /// Equal to the value of another field.
    MatchField,
    /// Matches a regular expression.
    MatchRegex,
    /// Caller-supplied predicate.
    Custom,
    /// Member of a list of allowed values.
    InList,
    /// Not already recorded in the submission store.
    Unused,
}

impl RuleKind {
    /// Every rule kind, in catalog order.
    pub const ALL: [Self; 14] = [
        Self::DoNothing,
        Self::Empty,
        Self::NotEmpty,
        Self::Number,
        Self::String,
        Self::Email,
        Self::Timezone,
        Self::Url,
        Self::Length,
        Self::MatchField,
        Self::MatchRegex,
        Self::Custom,
        Self::InList,
        Self::Unused,
    ];

    /// Returns the name used in form definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoNothing => "do_nothing",
            Self::Empty => "empty",
            Self::NotEmpty => "not_empty",
            Self::Number => "number",
            Self::String => "string",
            Self::Email => "email",
            Self::Timezone => "timezone",
            Self::Url => "url",
            Self::Length => "length",
            Self::MatchField => "match_field",
            Self::MatchRegex => "match_regex",
            Self::Custom => "custom",
            Self::InList => "in_list",
            Self::Unused => "unused",
        }
    }

    /// Returns the code raised when this rule fails.
    ///
    /// `Length` raises [`ErrorCode::TooShort`] or [`ErrorCode::TooLong`];
    /// this returns the former.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::DoNothing | Self::Empty => None,
            Self::NotEmpty => Some(ErrorCode::Empty),
            Self::Number => Some(ErrorCode::NotANumber),
            Self::String => Some(ErrorCode::NotAString),
            Self::Email => Some(ErrorCode::InvalidEmail),
            Self::Timezone => Some(ErrorCode::InvalidTimezone),
            Self::Url => Some(ErrorCode::InvalidUrl),
            Self::Length => Some(ErrorCode::TooShort),
            Self::MatchField => Some(ErrorCode::FieldMismatch),
            Self::MatchRegex => Some(ErrorCode::RegexMismatch),
            Self::Custom => Some(ErrorCode::CustomFailure),
            Self::InList => Some(ErrorCode::NotInList),
            Self::Unused => Some(ErrorCode::AlreadySubmitted),
        }
    }

    /// Returns a one-line description of the rule.
    pub fn description(&self) -> &'static str {
        match self {
            Self::DoNothing => "always passes",
            Self::Empty => "allows an empty value and skips the remaining rules",
            Self::NotEmpty => "value must not be empty",
            Self::Number => "value must be an integer",
            Self::String => "always passes",
            Self::Email => "value must be an email address",
            Self::Timezone => "value must be a timezone identifier",
            Self::Url => "value must be an absolute URL",
            Self::Length => "value length must be within min/max",
            Self::MatchField => "value must equal another field",
            Self::MatchRegex => "value must match a pattern",
            Self::Custom => "value must satisfy a callback",
            Self::InList => "value must be one of a list",
            Self::Unused => "value must not have been submitted before",
        }
    }
}

impl FromStr for RuleKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| FormError::UnknownRule(s.to_string()))
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag identifying why a field failed validation.
///
/// Codes compare by name, so `ErrorCode::custom("notemail")` equals
/// `ErrorCode::InvalidEmail`.
#[derive(Debug, Clone)]
pub enum ErrorCode {
    /// The field was not submitted at all.
    Missing,
    /// The field was submitted empty.
    Empty,
    /// Not an integer.
    NotANumber,
    /// Not a string; never raised by the built-in rule.
    NotAString,
    /// Not an email address.
    InvalidEmail,
    /// Not a known timezone identifier.
    InvalidTimezone,
    /// Not an absolute URL.
    InvalidUrl,
    /// Fewer characters than `min`.
    TooShort,
    /// More characters than `max`.
    TooLong,
    /// Differs from the field it must match.
    FieldMismatch,
    /// Does not match the rule's pattern.
    RegexMismatch,
    /// A custom rule failed without naming its own code.
    CustomFailure,
    /// Not one of the allowed values.
    NotInList,
    /// The duplicate-submission id was seen before.
    AlreadySubmitted,
    /// Caller-defined code.
    Custom(String),
}

impl ErrorCode {
    /// Creates a caller-defined code.
    pub fn custom(code: impl Into<String>) -> Self {
        Self::Custom(code.into())
    }

    /// Returns the code's name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Missing => "missing",
            Self::Empty => "empty",
            Self::NotANumber => "number",
            Self::NotAString => "string",
            Self::InvalidEmail => "notemail",
            Self::InvalidTimezone => "timezone",
            Self::InvalidUrl => "noturl",
            Self::TooShort => "stringshort",
            Self::TooLong => "stringlong",
            Self::FieldMismatch => "nomatchfield",
            Self::RegexMismatch => "nomatchregexfield",
            Self::CustomFailure => "custom",
            Self::NotInList => "notinlist",
            Self::AlreadySubmitted => "used",
            Self::Custom(code) => code,
        }
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        Self::custom(code)
    }
}

/// Ordered `(key, label)` pairs used for membership checks and select options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choices {
    entries: Vec<(String, String)>,
}

impl Choices {
    /// Creates a list whose keys are the positions of `values`.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.into()))
                .collect(),
        }
    }

    /// Creates a list from explicit `(key, label)` pairs.
    pub fn from_pairs<I, K, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, l)| (k.into(), l.into()))
                .collect(),
        }
    }

    /// Returns whether `value` equals a label, or a key when `use_keys` is set.
    pub fn contains(&self, value: &str, use_keys: bool) -> bool {
        self.entries
            .iter()
            .any(|(key, label)| label == value || (use_keys && key == value))
    }

    /// Iterates over `(key, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, l)| (k.as_str(), l.as_str()))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Choices {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

/// Predicate for [`RuleKind::Custom`], called with the value and the rule's params.
pub type Callback = Arc<dyn Fn(&str, &RuleParams) -> bool + Send + Sync>;

/// Named parameters of a rule. Unused parameters are ignored by the evaluator.
#[derive(Clone, Default)]
pub struct RuleParams {
    /// Minimum length for [`RuleKind::Length`].
    pub min: Option<usize>,
    /// Maximum length for [`RuleKind::Length`].
    pub max: Option<usize>,
    /// Literal list for [`RuleKind::InList`]; form list data wins over it.
    pub list: Option<Choices>,
    /// Pattern for [`RuleKind::MatchRegex`].
    pub pattern: Option<Regex>,
    /// Other field for [`RuleKind::MatchField`].
    pub field: Option<String>,
    /// Predicate for [`RuleKind::Custom`].
    pub callback: Option<Callback>,
    /// Code raised by a failing custom rule.
    pub error_code: Option<ErrorCode>,
    /// Membership also accepts list keys.
    pub use_keys: bool,
    /// Run a custom rule even when the field already has an error.
    pub always_run: bool,
    /// Free-form parameters handed to callbacks.
    pub extra: HashMap<String, String>,
}

impl fmt::Debug for RuleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleParams")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("list", &self.list)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("field", &self.field)
            .field("callback", &self.callback.is_some())
            .field("error_code", &self.error_code)
            .field("use_keys", &self.use_keys)
            .field("always_run", &self.always_run)
            .field("extra", &self.extra)
            .finish()
    }
}

/// A rule kind with its parameters.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: RuleKind,
    pub params: RuleParams,
}

impl From<RuleKind> for Rule {
    fn from(kind: RuleKind) -> Self {
        Self::new(kind)
    }
}

impl Rule {
    /// Creates a rule with no parameters.
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            params: RuleParams::default(),
        }
    }

    pub fn do_nothing() -> Self {
        Self::new(RuleKind::DoNothing)
    }

    pub fn empty() -> Self {
        Self::new(RuleKind::Empty)
    }

    pub fn not_empty() -> Self {
        Self::new(RuleKind::NotEmpty)
    }

    pub fn number() -> Self {
        Self::new(RuleKind::Number)
    }

    pub fn string() -> Self {
        Self::new(RuleKind::String)
    }

    pub fn email() -> Self {
        Self::new(RuleKind::Email)
    }

    pub fn timezone() -> Self {
        Self::new(RuleKind::Timezone)
    }

    pub fn url() -> Self {
        Self::new(RuleKind::Url)
    }

    /// Length rule; either bound may be omitted.
    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        let mut rule = Self::new(RuleKind::Length);
        rule.params.min = min;
        rule.params.max = max;
        rule
    }

    /// Value must equal the accumulated value of `field`.
    pub fn match_field(field: impl Into<String>) -> Self {
        let mut rule = Self::new(RuleKind::MatchField);
        rule.params.field = Some(field.into());
        rule
    }

    /// Value must match `pattern`.
    pub fn match_regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| FormError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let mut rule = Self::new(RuleKind::MatchRegex);
        rule.params.pattern = Some(regex);
        Ok(rule)
    }

    /// Custom predicate raising `error_code` when it returns false.
    pub fn custom<F>(error_code: impl Into<ErrorCode>, callback: F) -> Self
    where
        F: Fn(&str, &RuleParams) -> bool + Send + Sync + 'static,
    {
        let mut rule = Self::new(RuleKind::Custom);
        rule.params.callback = Some(Arc::new(callback));
        rule.params.error_code = Some(error_code.into());
        rule
    }

    /// Membership in a literal list. Form list data for the field still wins.
    pub fn in_list(list: impl Into<Choices>) -> Self {
        let mut rule = Self::new(RuleKind::InList);
        rule.params.list = Some(list.into());
        rule
    }

    /// Membership in the form's list data for the field.
    pub fn in_list_data() -> Self {
        Self::new(RuleKind::InList)
    }

    pub fn unused() -> Self {
        Self::new(RuleKind::Unused)
    }

    /// Accept list keys as well as labels.
    #[must_use]
    pub fn use_keys(mut self) -> Self {
        self.params.use_keys = true;
        self
    }

    /// Run a custom rule even if the field already failed another rule.
    #[must_use]
    pub fn always_run(mut self) -> Self {
        self.params.always_run = true;
        self
    }

    /// Overrides the code raised on failure.
    #[must_use]
    pub fn error_code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.params.error_code = Some(code.into());
        self
    }

    /// Adds a free-form parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.extra.insert(key.into(), value.into());
        self
    }

    /// Returns whether this rule lets an empty or absent value through.
    pub fn tolerates_empty(&self) -> bool {
        self.kind == RuleKind::Empty
    }
}

impl<S: Into<String>> From<Vec<S>> for Choices {
    fn from(values: Vec<S>) -> Self {
        Self::from_values(values)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Choices {
    fn from(values: [S; N]) -> Self {
        Self::from_values(values)
    }
}
