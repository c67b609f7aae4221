//! HTML helpers that re-render controls from the latest validation pass.

use ironhtml::html;
use ironhtml::typed::Element;
use ironhtml_elements::{Li, Ul};

use crate::evaluator::timezone_identifiers;
use crate::form::Form;
use crate::guard::{generate_submission_id, CSRF_FIELD, SUBMISSION_ID_FIELD};
use crate::rules::{Choices, ErrorCode};
use crate::widgets::{Input, Select, Textarea, Widget, WidgetAttrs};

/// Placeholder in a too-long message replaced with the submitted length.
pub const LENGTH_PLACEHOLDER: &str = "{len}";

impl Form {
    /// Returns the name attribute for `field`, `namespace[field]` when namespaced.
    pub fn full_name(&self, field: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}[{field}]"),
            None => field.to_string(),
        }
    }

    /// Renders an input for `name`.
    ///
    /// `type` defaults to `text`; `textarea` renders a textarea instead. The
    /// submitted value is filled back in unless the control is a password or
    /// `attrs` carries a non-empty `value`. Fields with errors get the
    /// configured error class.
    pub fn input(&self, name: &str, attrs: WidgetAttrs) -> String {
        let mut attrs = attrs;
        let full_name = attrs.remove("name").unwrap_or_else(|| self.full_name(name));
        let input_type = attrs.remove("type").unwrap_or_else(|| "text".to_string());
        let explicit = attrs.remove("value").unwrap_or_default();

        self.mark_error(name, &mut attrs);

        let value = match self.data.get(name) {
            Some(submitted) if explicit.is_empty() && input_type != "password" => submitted.clone(),
            _ => explicit,
        };

        if input_type == "textarea" {
            Textarea.render(&full_name, Some(&value), &attrs)
        } else {
            Input::new(input_type).render(&full_name, Some(&value), &attrs)
        }
    }

    /// Renders a select for `name`.
    ///
    /// Without `choices` the form's list data for `name` is used. A `type`
    /// attribute of `timezone` lists every timezone instead, and a
    /// `placeholder` attribute becomes a disabled first option.
    pub fn select(
        &self,
        name: &str,
        attrs: WidgetAttrs,
        choices: Option<&Choices>,
        use_keys: bool,
    ) -> String {
        let mut attrs = attrs;
        let full_name = attrs.remove("name").unwrap_or_else(|| self.full_name(name));
        let select_type = attrs.remove("type");
        let placeholder = attrs.remove("placeholder");

        let choices = if select_type.as_deref() == Some("timezone") {
            Choices::from_values(timezone_identifiers())
        } else {
            choices
                .filter(|c| !c.is_empty())
                .or_else(|| self.list_data(name))
                .cloned()
                .unwrap_or_default()
        };

        self.mark_error(name, &mut attrs);

        let mut widget = Select::new(choices).use_keys(use_keys);
        if let Some(placeholder) = placeholder {
            widget = widget.placeholder(placeholder);
        }
        widget.render(&full_name, self.data.get(name).map(String::as_str), &attrs)
    }

    /// Renders the hidden CSRF token and, when enabled, a fresh duplicate-submission id.
    pub fn csrf(&self) -> String {
        let mut html = String::new();
        if let Some(token) = self.config.active_csrf_token() {
            html.push_str(&self.input(CSRF_FIELD, hidden(token)));
        }
        if self.prevent_duplicates {
            html.push_str(&self.input(SUBMISSION_ID_FIELD, hidden(&generate_submission_id())));
        }
        html
    }

    /// Renders a submit button named after the form, as checked by [`Form::is_me`].
    pub fn submit_button(&self, attrs: WidgetAttrs) -> String {
        let attrs = attrs.with("type", "submit");
        self.input(&self.name, attrs)
    }

    /// Renders `message` in a `<div>` when `field` has any error.
    pub fn error(&self, field: &str, message: &str) -> String {
        if self.errors.field_has_error(field, None) {
            html! { div { #message } }.render()
        } else {
            String::new()
        }
    }

    /// Renders one `<div>` per message whose code `field` has, in `messages` order.
    ///
    /// `{len}` in the [`ErrorCode::TooLong`] message becomes the submitted length.
    pub fn error_messages(&self, field: &str, messages: &[(ErrorCode, &str)]) -> String {
        messages
            .iter()
            .filter(|(code, _)| self.errors.field_has_error(field, Some(code)))
            .map(|(code, message)| {
                let text = self.message_text(field, code, message);
                html! { div { #text } }.render()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders every recorded error as a list inside a div with the error class.
    ///
    /// Codes without an entry in `messages` are shown by name. Returns an
    /// empty string when the form has no errors.
    pub fn error_summary(&self, messages: &[(ErrorCode, &str)]) -> String {
        if !self.errors.has_errors() {
            return String::new();
        }

        let mut items: Vec<(&str, &ErrorCode)> = self.errors.all_errors();
        items.sort_by(|a, b| a.0.cmp(b.0));
        let lines: Vec<String> = items
            .into_iter()
            .map(|(field, code)| {
                messages
                    .iter()
                    .find(|(c, _)| c == code)
                    .map_or_else(
                        || format!("{field}: {code}"),
                        |(_, m)| self.message_text(field, code, m),
                    )
            })
            .collect();

        let class = self.config.css_error_class.clone();
        html! { div.class(#class) }
            .child::<Ul, _>(|ul| {
                ul.children(lines.iter(), |line, li: Element<Li>| li.text(line.as_str()))
            })
            .render()
    }

    /// Renders every accepted value except the CSRF token as a hidden input.
    pub fn dump_into_hidden_fields(&self) -> String {
        let names = std::iter::once(SUBMISSION_ID_FIELD)
            .chain(self.fields.iter().map(|(name, _)| name.as_str()));
        names
            .filter_map(|name| {
                let value = self.data.get(name)?;
                Some(self.input(name, hidden(value)))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn mark_error(&self, name: &str, attrs: &mut WidgetAttrs) {
        if self.errors.field_has_error(name, None) {
            attrs.add_class(&self.config.css_error_class);
        }
    }

    fn message_text(&self, field: &str, code: &ErrorCode, message: &str) -> String {
        if *code == ErrorCode::TooLong {
            let len = self.data.get(field).map_or(0, |v| v.chars().count());
            message.replace(LENGTH_PLACEHOLDER, &len.to_string())
        } else {
            message.to_string()
        }
    }
}

fn hidden(value: &str) -> WidgetAttrs {
    WidgetAttrs::new()
        .with("type", "hidden")
        .with("value", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormConfig;
    use crate::rules::Rule;
    use crate::source::SubmittedData;

    fn failed_form() -> Form {
        let mut form = Form::new("signup")
            .field("email", vec![Rule::email(), Rule::length(None, Some(5))])
            .field("password", Rule::length(Some(8), None))
            .field("nick", Rule::do_nothing());
        let source = SubmittedData::from_pairs([
            ("email", "not-an-email"),
            ("password", "short"),
            ("nick", "ada"),
        ]);
        assert!(form.validate(&source, None).is_err());
        form
    }

    #[test]
    fn test_input_refills_value_and_marks_error() {
        let form = failed_form();
        let html = form.input("email", WidgetAttrs::new().with("class", "wide"));
        assert_eq!(
            html,
            r#"<input type="text" name="email" value="not-an-email" class="wide Error" />"#
        );
    }

    #[test]
    fn test_input_without_error() {
        let form = failed_form();
        assert_eq!(
            form.input("nick", WidgetAttrs::new()),
            r#"<input type="text" name="nick" value="ada" />"#
        );
    }

    #[test]
    fn test_password_is_not_refilled() {
        let form = failed_form();
        let html = form.input("password", WidgetAttrs::new().with("type", "password"));
        assert_eq!(
            html,
            r#"<input type="password" name="password" value="" class="Error" />"#
        );
    }

    #[test]
    fn test_explicit_value_wins() {
        let form = failed_form();
        let html = form.input("nick", WidgetAttrs::new().with("value", "bob"));
        assert!(html.contains(r#"value="bob""#));
    }

    #[test]
    fn test_textarea_input() {
        let form = failed_form();
        let html = form.input("nick", WidgetAttrs::new().with("type", "textarea"));
        assert_eq!(html, r#"<textarea name="nick">ada</textarea>"#);
    }

    #[test]
    fn test_namespaced_names() {
        let form = Form::new("f").namespace("user");
        assert_eq!(form.full_name("email"), "user[email]");
        assert!(form
            .input("email", WidgetAttrs::new())
            .contains(r#"name="user[email]""#));
    }

    #[test]
    fn test_custom_error_class() {
        let mut form = Form::new("f")
            .config(FormConfig::new().css_error_class("is-invalid"))
            .field("n", Rule::number());
        assert!(form
            .validate(&SubmittedData::from_pairs([("n", "x")]), None)
            .is_err());
        assert!(form
            .input("n", WidgetAttrs::new())
            .contains(r#"class="is-invalid""#));
    }

    #[test]
    fn test_select_uses_list_data_and_selection() {
        let mut form = Form::new("f")
            .field("size", Rule::in_list_data())
            .list("size", ["S", "M", "L"]);
        assert!(form
            .validate(&SubmittedData::from_pairs([("size", "M")]), None)
            .is_ok());
        let html = form.select("size", WidgetAttrs::new(), None, false);
        assert!(html.starts_with(r#"<select name="size">"#));
        assert!(html.contains(r#"<option selected="selected">M</option>"#));
        assert!(html.contains("<option>L</option>"));
    }

    #[test]
    fn test_select_placeholder_and_explicit_choices() {
        let form = Form::new("f");
        let choices = Choices::from_pairs([("1", "One")]);
        let html = form.select(
            "n",
            WidgetAttrs::new().with("placeholder", "Choose"),
            Some(&choices),
            true,
        );
        assert!(html.contains("<option disabled selected>Choose</option>"));
        assert!(html.contains(r#"<option value="1">One</option>"#));
        assert!(!html.contains(r#"placeholder="#));
    }

    #[test]
    fn test_timezone_select() {
        let form = Form::new("f");
        let html = form.select("tz", WidgetAttrs::new().with("type", "timezone"), None, false);
        assert!(html.contains("<option>Europe/London</option>"));
        assert!(!html.contains("<option>US/Pacific</option>"));
        assert!(!html.contains("type="));
    }

    #[test]
    fn test_csrf_and_duplicate_fields() {
        let form = Form::new("f")
            .config(FormConfig::new().csrf_token("T1"))
            .prevent_duplicates();
        let html = form.csrf();
        assert!(html.contains(r#"<input type="hidden" name="csrf" value="T1" />"#));
        assert!(html.contains(r#"name="unique_uuid""#));

        assert_eq!(Form::new("f").csrf(), "");
    }

    #[test]
    fn test_submit_button() {
        let form = Form::new("signup").namespace("ns");
        let html = form.submit_button(WidgetAttrs::new().with("value", "Send"));
        assert_eq!(html, r#"<input type="submit" name="ns[signup]" value="Send" />"#);
    }

    #[test]
    fn test_error_message() {
        let form = failed_form();
        assert_eq!(form.error("email", "Bad email"), "<div>Bad email</div>");
        assert_eq!(form.error("nick", "Bad nick"), "");
    }

    #[test]
    fn test_error_messages_per_code() {
        let form = failed_form();
        let html = form.error_messages(
            "email",
            &[
                (ErrorCode::InvalidEmail, "Not an email"),
                (ErrorCode::TooShort, "Too short"),
                (ErrorCode::TooLong, "Too long: {len} characters"),
            ],
        );
        assert_eq!(
            html,
            "<div>Not an email</div>\n<div>Too long: 12 characters</div>"
        );
    }

    #[test]
    fn test_error_summary() {
        let form = failed_form();
        let html = form.error_summary(&[(ErrorCode::InvalidEmail, "Not an email")]);
        assert!(html.contains("Error"));
        assert!(html.contains("Not an email"));
        assert!(html.contains("password: stringshort"));

        assert_eq!(Form::new("f").error_summary(&[]), "");
    }

    #[test]
    fn test_dump_into_hidden_fields_skips_csrf() {
        let mut form = Form::new("f")
            .config(FormConfig::new().csrf_token("T1"))
            .field("a", Rule::do_nothing())
            .field("b", Rule::do_nothing());
        let source = SubmittedData::from_pairs([("a", "1"), ("b", "2"), ("csrf", "T1")]);
        assert!(form.validate(&source, None).is_ok());
        assert_eq!(
            form.dump_into_hidden_fields(),
            "<input type=\"hidden\" name=\"a\" value=\"1\" />\n<input type=\"hidden\" name=\"b\" value=\"2\" />"
        );
    }
}
