//! Evaluation of a single rule against a submitted value.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

use crate::error::ValidationErrors;
use crate::guard::SubmissionStore;
use crate::rules::{Choices, ErrorCode, Rule, RuleKind};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// Regions of the canonical `Area/Location` timezone identifiers.
const TIMEZONE_REGIONS: [&str; 10] = [
    "Africa",
    "America",
    "Antarctica",
    "Arctic",
    "Asia",
    "Atlantic",
    "Australia",
    "Europe",
    "Indian",
    "Pacific",
];

/// Returns whether `name` is a listed timezone: `UTC` or a known
/// `Area/Location` identifier. Legacy aliases such as `US/Pacific` or `EST`
/// are rejected.
pub fn is_listed_timezone(name: &str) -> bool {
    let listed = name == "UTC"
        || name
            .split_once('/')
            .is_some_and(|(region, _)| TIMEZONE_REGIONS.contains(&region));
    listed && name.parse::<chrono_tz::Tz>().is_ok()
}

/// Listed timezone identifiers in catalog order.
pub fn timezone_identifiers() -> impl Iterator<Item = &'static str> {
    chrono_tz::TZ_VARIANTS
        .iter()
        .map(|tz| tz.name())
        .filter(|name| is_listed_timezone(name))
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The value satisfies the rule.
    Pass,
    /// The value is empty and the rule allows it; the rest of the chain is skipped.
    EmptyOk,
    /// The value violates the rule.
    Fail(ErrorCode),
}

/// Per-field allowed-value lists attached to a form.
pub trait ListSource {
    /// Returns the list attached to `field`, if any.
    fn list_data(&self, field: &str) -> Option<&Choices>;
}

impl ListSource for HashMap<String, Choices> {
    fn list_data(&self, field: &str) -> Option<&Choices> {
        self.get(field)
    }
}

/// What a rule may read besides the value itself.
pub struct RuleContext<'a> {
    /// Values accumulated so far in this pass.
    pub data: &'a HashMap<String, String>,
    /// Form-attached list data.
    pub lists: &'a dyn ListSource,
    /// Errors recorded so far in this pass.
    pub errors: &'a ValidationErrors,
    /// Previously seen duplicate-submission ids.
    pub submissions: Option<&'a dyn SubmissionStore>,
}

/// Evaluates `rule` against `value`, submitted for `field`.
pub fn evaluate(rule: &Rule, value: &str, field: &str, ctx: &RuleContext<'_>) -> Outcome {
    let params = &rule.params;
    let outcome = match rule.kind {
        RuleKind::DoNothing | RuleKind::String => Outcome::Pass,
        RuleKind::Empty => {
            if value.is_empty() {
                Outcome::EmptyOk
            } else {
                Outcome::Pass
            }
        }
        RuleKind::NotEmpty => check(!value.is_empty(), ErrorCode::Empty),
        RuleKind::Number => check(value.trim().parse::<i64>().is_ok(), ErrorCode::NotANumber),
        RuleKind::Email => check(EMAIL_REGEX.is_match(value), ErrorCode::InvalidEmail),
        RuleKind::Timezone => check(is_listed_timezone(value), ErrorCode::InvalidTimezone),
        RuleKind::Url => check(url::Url::parse(value).is_ok(), ErrorCode::InvalidUrl),
        RuleKind::Length => {
            let len = value.chars().count();
            if params.min.is_some_and(|min| len < min) {
                Outcome::Fail(ErrorCode::TooShort)
            } else if params.max.is_some_and(|max| len > max) {
                Outcome::Fail(ErrorCode::TooLong)
            } else {
                Outcome::Pass
            }
        }
        RuleKind::MatchField => {
            let other = params.field.as_deref().and_then(|f| ctx.data.get(f));
            check(other.is_some_and(|o| o == value), ErrorCode::FieldMismatch)
        }
        RuleKind::MatchRegex => match &params.pattern {
            Some(pattern) => check(pattern.is_match(value), ErrorCode::RegexMismatch),
            None => {
                warn!(field, "match_regex rule without a pattern");
                Outcome::Pass
            }
        },
        RuleKind::Custom => {
            if !params.always_run && ctx.errors.field_has_error(field, None) {
                Outcome::Pass
            } else if let Some(callback) = &params.callback {
                let code = params
                    .error_code
                    .clone()
                    .unwrap_or(ErrorCode::CustomFailure);
                check(callback(value, params), code)
            } else {
                warn!(field, "custom rule without a callback");
                Outcome::Pass
            }
        }
        RuleKind::InList => {
            let list = ctx.lists.list_data(field).or(params.list.as_ref());
            check(
                list.is_some_and(|l| l.contains(value, params.use_keys)),
                ErrorCode::NotInList,
            )
        }
        RuleKind::Unused => {
            let seen = ctx.submissions.is_some_and(|s| s.contains(value));
            check(!seen, ErrorCode::AlreadySubmitted)
        }
    };

    trace!(field, rule = %rule.kind, ?outcome, "evaluated rule");
    outcome
}

fn check(ok: bool, code: ErrorCode) -> Outcome {
    if ok {
        Outcome::Pass
    } else {
        Outcome::Fail(code)
    }
}
