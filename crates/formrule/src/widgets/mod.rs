//! Form widgets for rendering HTML controls.

use crate::rules::Choices;

/// Attributes that can be applied to a widget, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetAttrs {
    attrs: Vec<(String, String)>,
}

impl WidgetAttrs {
    /// Creates new empty widget attributes.
    pub fn new() -> Self {
        Self { attrs: Vec::new() }
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Gets an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Removes an attribute and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(k, _)| k == key)?;
        Some(self.attrs.remove(index).1)
    }

    /// Appends `class` to the `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        let merged = match self.get("class") {
            Some(current) if !current.is_empty() => format!("{current} {class}"),
            _ => class.to_string(),
        };
        self.set("class", merged);
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Renders attributes as an HTML attribute string.
    pub fn to_html(&self) -> String {
        self.attrs
            .iter()
            .map(|(k, v)| format!(r#"{}="{}""#, html_escape(k), html_escape(v)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Builder method to set an attribute.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    fn extra(&self) -> String {
        if self.attrs.is_empty() {
            String::new()
        } else {
            format!(" {}", self.to_html())
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WidgetAttrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// Trait for widgets that render an HTML control.
pub trait Widget {
    /// Renders the widget as HTML.
    ///
    /// # Arguments
    /// * `name` - The full field name (used for the name attribute)
    /// * `value` - The current value (if any)
    /// * `attrs` - Additional HTML attributes
    fn render(&self, name: &str, value: Option<&str>, attrs: &WidgetAttrs) -> String;
}

/// An `<input>` of any type.
#[derive(Debug, Clone)]
pub struct Input {
    /// The HTML input type (text, email, password, hidden, submit, ...).
    pub input_type: String,
}

impl Default for Input {
    fn default() -> Self {
        Self::new("text")
    }
}

impl Input {
    pub fn new(input_type: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
        }
    }
}

impl Widget for Input {
    fn render(&self, name: &str, value: Option<&str>, attrs: &WidgetAttrs) -> String {
        let value_attr = value
            .map(|v| format!(r#" value="{}""#, html_escape(v)))
            .unwrap_or_default();
        format!(
            r#"<input type="{}" name="{}"{value_attr}{} />"#,
            html_escape(&self.input_type),
            html_escape(name),
            attrs.extra()
        )
    }
}

/// A multi-line `<textarea>`.
#[derive(Debug, Clone, Default)]
pub struct Textarea;

impl Widget for Textarea {
    fn render(&self, name: &str, value: Option<&str>, attrs: &WidgetAttrs) -> String {
        let content = value.map(html_escape).unwrap_or_default();
        format!(
            r#"<textarea name="{}"{}>{content}</textarea>"#,
            html_escape(name),
            attrs.extra()
        )
    }
}

/// A `<select>` dropdown.
#[derive(Debug, Clone, Default)]
pub struct Select {
    /// Options as `(key, label)` pairs.
    pub choices: Choices,
    /// Emit keys as option values and select by key or label.
    pub use_keys: bool,
    /// Disabled first option shown when nothing is selected.
    pub placeholder: Option<String>,
}

impl Select {
    pub fn new(choices: Choices) -> Self {
        Self {
            choices,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn use_keys(mut self, use_keys: bool) -> Self {
        self.use_keys = use_keys;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }
}

impl Widget for Select {
    fn render(&self, name: &str, value: Option<&str>, attrs: &WidgetAttrs) -> String {
        let mut lines = vec![format!(r#"<select name="{}"{}>"#, html_escape(name), attrs.extra())];

        if let Some(placeholder) = &self.placeholder {
            let selected = if value.is_none() { " selected" } else { "" };
            lines.push(format!(
                "<option disabled{selected}>{}</option>",
                html_escape(placeholder)
            ));
        }

        for (key, label) in self.choices.iter() {
            let (value_attr, is_selected) = if self.use_keys {
                (
                    format!(r#" value="{}""#, html_escape(key)),
                    value == Some(key) || value == Some(label),
                )
            } else {
                (String::new(), value == Some(label))
            };
            let selected = if is_selected { r#" selected="selected""# } else { "" };
            lines.push(format!(
                "<option{value_attr}{selected}>{}</option>",
                html_escape(label)
            ));
        }

        lines.push("</select>".to_string());
        lines.join("\n")
    }
}

/// Escapes HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_input() {
        let html = Input::new("hidden").render("csrf", Some("abc123"), &WidgetAttrs::new());
        assert_eq!(html, r#"<input type="hidden" name="csrf" value="abc123" />"#);
    }

    #[test]
    fn test_text_input_with_attrs() {
        let attrs = WidgetAttrs::new().with("class", "wide").with("id", "user");
        let html = Input::default().render("username", None, &attrs);
        assert_eq!(
            html,
            r#"<input type="text" name="username" class="wide" id="user" />"#
        );
    }

    #[test]
    fn test_textarea() {
        let html = Textarea.render("content", Some("<b>Hello</b>"), &WidgetAttrs::new());
        assert_eq!(
            html,
            r#"<textarea name="content">&lt;b&gt;Hello&lt;/b&gt;</textarea>"#
        );
    }

    #[test]
    fn test_select_by_label() {
        let select = Select::new(Choices::from_values(["Red", "Green"]));
        let html = select.render("colour", Some("Green"), &WidgetAttrs::new());
        assert_eq!(
            html,
            "<select name=\"colour\">\n<option>Red</option>\n<option selected=\"selected\">Green</option>\n</select>"
        );
    }

    #[test]
    fn test_select_by_key_with_placeholder() {
        let select = Select::new(Choices::from_pairs([("au", "Australia"), ("nz", "New Zealand")]))
            .use_keys(true)
            .placeholder("Pick one");
        let html = select.render("country", None, &WidgetAttrs::new());
        assert!(html.contains("<option disabled selected>Pick one</option>"));
        assert!(html.contains(r#"<option value="au">Australia</option>"#));

        let html = select.render("country", Some("nz"), &WidgetAttrs::new());
        assert!(html.contains("<option disabled>Pick one</option>"));
        assert!(html.contains(r#"<option value="nz" selected="selected">New Zealand</option>"#));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("\"test\""), "&quot;test&quot;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }

    #[test]
    fn test_widget_attrs() {
        let mut attrs = WidgetAttrs::new()
            .with("class", "form-control")
            .with("id", "my-input");
        attrs.set("class", "field");
        attrs.add_class("Error");
        assert_eq!(attrs.to_html(), r#"class="field Error" id="my-input""#);
        assert_eq!(attrs.remove("id").as_deref(), Some("my-input"));
        assert_eq!(attrs.get("id"), None);
    }

    #[test]
    fn test_attrs_from_iter() {
        let attrs: WidgetAttrs = [("type", "password"), ("size", "20")].into_iter().collect();
        assert_eq!(attrs.get("type"), Some("password"));
        assert!(!attrs.is_empty());
    }
}
