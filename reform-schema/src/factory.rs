//! Schema construction from field configurations.
//!
//! A [`FieldConf`] describes one form field the way a content type
//! declares it: an id, a datatype tag, size limits, required flag,
//! default and a free-form settings map. [`SchemaFactory`] translates a
//! list of them into a root mapping node, one child per field.
//!
//! # Example
//!
//! ```rust,ignore
//! use reform_schema::factory::{FieldConf, SchemaFactory};
//!
//! let fields = vec![
//!     FieldConf::new("title", "string").required(),
//!     FieldConf::new("pubdate", "date"),
//! ];
//! let schema = SchemaFactory::default().build(&fields);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use tracing::{trace, warn};

use crate::config::FactoryConfig;
use crate::error::SchemaResult;
use crate::node::{Bindings, SchemaNode};
use crate::types::{
    Boolean, Confirmed, Date, DateTime, FileData, Float, Integer, List, Mapping, Str,
};
use crate::validators::{All, Email, Length, Regex, Validator};
use crate::value::Value;

/// Configuration of a single field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConf {
    /// Field id, used as the node name
    pub id: String,
    /// Display name, used as the node title
    pub name: String,
    /// Datatype tag such as `string`, `number` or `date`
    pub datatype: String,
    /// Maximum length for string types
    pub size: Option<usize>,
    /// Width or height hint for the widget
    pub len: Option<usize>,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub description: String,
    pub hidden: bool,
    /// Free-form settings; `widget`, `pattern`, `single`, `update`,
    /// `values`, `addempty`, `width` and `height` are understood
    pub settings: Map<String, serde_json::Value>,
    /// Validator replacing the datatype's default one
    #[serde(skip)]
    pub validator: Option<Validator>,
    /// Prebuilt node used instead of a generated one
    #[serde(skip)]
    pub node: Option<SchemaNode>,
}

impl FieldConf {
    pub fn new(id: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            datatype: datatype.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_len(mut self, len: usize) -> Self {
        self.len = Some(len);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    #[must_use]
    pub fn with_node(mut self, node: SchemaNode) -> Self {
        self.node = Some(node);
        self
    }

    fn setting_bool(&self, key: &str) -> bool {
        self.settings
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    fn setting_u64(&self, key: &str, default: u64) -> u64 {
        self.settings
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(default)
    }
}

/// Builds schema nodes from [`FieldConf`]s.
#[derive(Debug, Clone, Default)]
pub struct SchemaFactory {
    config: FactoryConfig,
    force: bool,
}

impl SchemaFactory {
    /// Factory with a validated configuration.
    pub fn new(config: FactoryConfig) -> SchemaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            force: false,
        })
    }

    /// Generate nodes even for fields that carry a prebuilt node.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Build a root mapping with one child per supported field.
    pub fn build(&self, fields: &[FieldConf]) -> SchemaNode {
        let mut root = SchemaNode::new(Mapping::with_unknown(self.config.unknown));
        for field in fields {
            if let Some(node) = self.build_node(field) {
                root.add(node);
            }
        }
        trace!(fields = fields.len(), children = root.children.len(), "Schema built");
        root
    }

    /// Build and bind in one step.
    pub fn build_bound(&self, fields: &[FieldConf], kw: &Bindings) -> SchemaResult<SchemaNode> {
        self.build(fields).bind(kw)
    }

    /// Build the node of a single field; `None` for unsupported datatypes.
    pub fn build_node(&self, field: &FieldConf) -> Option<SchemaNode> {
        if let (Some(node), false) = (&field.node, self.force) {
            return Some(node.clone());
        }

        let cfg = &self.config;
        let input_size = field.len.unwrap_or(cfg.input_size);
        let text_input = json!({"type": "text", "size": input_size});
        let textarea = json!({"type": "textarea", "rows": 10, "cols": 60});

        let (node, validator, widget): (SchemaNode, Option<Validator>, _) =
            if field.hidden {
                (SchemaNode::new(Str::new()), None, json!({"type": "hidden"}))
            } else {
                match field.datatype.as_str() {
                    "string" | "unitlist" | "url" => (
                        SchemaNode::new(Str::new()),
                        Some(Length::at_most(field.size.unwrap_or(cfg.string_size)).into()),
                        text_input,
                    ),
                    "text" | "urllist" => (
                        SchemaNode::new(Str::new()),
                        Some(Length::at_most(field.size.unwrap_or(cfg.text_size)).into()),
                        textarea,
                    ),
                    "htext" => (
                        SchemaNode::new(Str::new()),
                        Some(Length::at_most(field.size.unwrap_or(cfg.text_size)).into()),
                        json!({
                            "type": "richtext",
                            "width": field.setting_u64("width", 500),
                            "height": field.setting_u64("height", 250),
                        }),
                    ),
                    "code" | "json" => (
                        SchemaNode::new(Str::new()),
                        Some(Length::at_most(field.size.unwrap_or(cfg.text_size)).into()),
                        json!({"type": "code"}),
                    ),
                    "number" | "unit" => (SchemaNode::new(Integer), None, text_input),
                    "float" => (SchemaNode::new(Float), None, text_input),
                    "bool" => (SchemaNode::new(Boolean), None, json!({"type": "checkbox"})),
                    "date" => (SchemaNode::new(Date::new()), None, json!({"type": "date"})),
                    "datetime" => (SchemaNode::new(DateTime::new()), None, json!({"type": "datetime"})),
                    "file" => (SchemaNode::new(FileData), None, json!({"type": "file"})),
                    "list" => (SchemaNode::new(Str::new()), None, choice_widget(field, "select", None)),
                    "radio" => (SchemaNode::new(Str::new()), None, choice_widget(field, "radio", None)),
                    "mselection" => (
                        SchemaNode::new(List::new(true)),
                        None,
                        choice_widget(
                            field,
                            "select",
                            Some(field.len.unwrap_or(cfg.selection_size)),
                        ),
                    ),
                    "mcheckboxes" => (
                        SchemaNode::new(List::new(true)),
                        None,
                        choice_widget(field, "checkboxes", None),
                    ),
                    "email" => (SchemaNode::new(Str::new()), Some(Email::new().into()), text_input),
                    "password" => {
                        let length = Length::between(cfg.password_min, cfg.password_max).into();
                        if field.setting_bool("single") {
                            (
                                SchemaNode::new(Str::new()),
                                Some(length),
                                json!({"type": "password", "size": input_size}),
                            )
                        } else {
                            let confirmed = Confirmed::new(Str::new())
                                .with_suffix(cfg.confirm_suffix.clone())
                                .with_mismatch_message("Password did not match confirm");
                            (
                                SchemaNode::new(confirmed),
                                Some(length),
                                json!({
                                    "type": "checked_password",
                                    "size": input_size,
                                    "update": field.setting_bool("update"),
                                }),
                            )
                        }
                    }
                    other => {
                        trace!(field = %field.id, datatype = other, "Skipping unsupported datatype");
                        return None;
                    }
                }
            };

        let mut node = node.with_name(field.id.as_str());
        if !field.name.is_empty() {
            node = node.with_title(field.name.as_str());
        }
        node = node.with_description(field.description.as_str());

        let validator = field.validator.clone().or(validator);
        if let Some(validator) = with_pattern(field, validator) {
            node = node.with_validator(validator);
        }
        node = node.with_widget(field.settings.get("widget").cloned().unwrap_or(widget));

        if !field.required {
            node = node.with_missing(Value::Null);
        }
        if let Some(default) = field.default.clone().filter(|d| !d.is_null()) {
            node = node.with_default(Value::from(default));
        }
        Some(node)
    }
}

/// Widget hint for choice fields, listing `settings.values`.
fn choice_widget(field: &FieldConf, kind: &str, size: Option<usize>) -> serde_json::Value {
    let mut values = field
        .settings
        .get("values")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default();
    if field.setting_bool("addempty") {
        values.insert(0, json!({"id": "", "name": ""}));
    }
    let mut widget = json!({"type": kind, "values": values});
    if let Some(size) = size {
        widget["size"] = json!(size);
    }
    widget
}

/// Add a `settings.pattern` regex to the field's validator.
fn with_pattern(field: &FieldConf, validator: Option<Validator>) -> Option<Validator> {
    let Some(pattern) = field.settings.get("pattern").and_then(|p| p.as_str()) else {
        return validator;
    };
    match Regex::new(pattern) {
        Ok(regex) => Some(match validator {
            Some(existing) => All::new().with(existing).with(regex).into(),
            None => regex.into(),
        }),
        Err(err) => {
            warn!(field = %field.id, pattern, error = %err, "Ignoring invalid pattern");
            validator
        }
    }
}
