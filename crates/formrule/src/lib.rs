//! # formrule
//!
//! Rule-based validation of submitted HTML forms, with helpers that render
//! the controls back with the submitted values and error markers.
//!
//! This crate provides:
//! - A catalog of named validation rules and their error codes
//! - Forms declared in code or loaded from JSON definition files
//! - CSRF and duplicate-submission guard fields
//! - HTML rendering helpers for inputs, selects and error summaries
//!
//! ## Quick Start
//!
//! ```rust
//! use formrule::{ErrorCode, Form, FormConfig, FormError, Rule, SubmittedData};
//!
//! let mut form = Form::new("signup")
//!     .config(FormConfig::new().csrf_token("T1"))
//!     .field("email", vec![Rule::not_empty(), Rule::email()])
//!     .field("website", vec![Rule::empty(), Rule::url()])
//!     .field("username", Rule::length(Some(3), Some(20)));
//!
//! let submitted = SubmittedData::from_pairs([
//!     ("csrf", "T1"),
//!     ("email", "a@b.com"),
//!     ("website", ""),
//!     ("username", "jo"),
//! ]);
//!
//! match form.validate(&submitted, None) {
//!     Err(FormError::ValidationErrors(errors)) => {
//!         assert_eq!(errors.get("username"), Some(&[ErrorCode::TooShort][..]));
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//!
//! // Controls are re-filled with what was submitted.
//! let html = form.input("email", Default::default());
//! assert!(html.contains(r#"value="a@b.com""#));
//! ```
//!
//! ## Rules
//!
//! Each field carries one [`Rule`] or a chain of them. A chain is evaluated
//! in order and every failing rule adds its code; a leading [`Rule::empty`]
//! lets an empty value through without running the rest.
//!
//! ## Definitions
//!
//! Forms can also be loaded by name from `<forms_dir>/<name>.form.json`,
//! see [`definition`].

pub mod config;
pub mod definition;
mod error;
pub mod evaluator;
mod form;
pub mod guard;
mod render;
pub mod rules;
pub mod source;
pub mod widgets;

pub use config::FormConfig;
pub use definition::{load_form, CallbackRegistry, FormDefinition};
pub use error::{FormError, Result, ValidationErrors};
pub use evaluator::{evaluate, ListSource, Outcome, RuleContext};
pub use form::{FieldSpec, Form, FormData, FormSchema, VerifyHook};
pub use guard::{MemorySubmissionStore, SubmissionStore};
pub use render::LENGTH_PLACEHOLDER;
pub use rules::{Choices, ErrorCode, Rule, RuleKind, RuleParams};
pub use source::{DataSource, Lookup, SubmittedData};
pub use widgets::WidgetAttrs;
