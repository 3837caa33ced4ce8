//! Interpolating error messages.
//!
//! A [`Message`] keeps its template and mapping separate until it is
//! rendered, so a translation layer can swap the template before the
//! `${name}` placeholders are filled in.

use std::collections::BTreeMap;
use std::fmt;

/// A message template with `${name}` placeholders and a machine readable code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Template text, e.g. `"${val} is less than minimum value ${min}"`
    pub template: String,
    /// Placeholder values
    pub mapping: BTreeMap<String, String>,
    /// Short error code such as `required` or `range`
    pub code: String,
}

impl Message {
    /// Create a message with the generic `invalid` code.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            mapping: BTreeMap::new(),
            code: "invalid".to_string(),
        }
    }

    /// Add a placeholder value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.mapping.insert(key.into(), value.to_string());
        self
    }

    /// Set the error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Fill the placeholders of this message's template.
    pub fn interpolate(&self) -> String {
        interpolate(&self.template, &self.mapping)
    }

    /// Fill the placeholders of another template (e.g. a translation).
    pub fn interpolate_template(&self, template: &str) -> String {
        interpolate(template, &self.mapping)
    }
}

/// Replace every `${key}` in `template` with its mapping entry.
///
/// Unknown placeholders are left as they are.
pub fn interpolate(template: &str, mapping: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match mapping.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.interpolate())
    }
}

impl From<&str> for Message {
    fn from(template: &str) -> Self {
        Message::new(template)
    }
}

impl From<String> for Message {
    fn from(template: String) -> Self {
        Message::new(template)
    }
}
