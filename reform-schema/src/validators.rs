//! Validators run by a node after successful coercion.
//!
//! A validator receives the node and the deserialized value and returns
//! `Err(Invalid)` when the value breaks a rule. Validators never see the
//! `null` sentinel: absent values are handled by the node's missing logic
//! before validation.
//!
//! # Example
//!
//! ```rust,ignore
//! use reform_schema::validators::{All, Length, Regex};
//!
//! let validator = All::new()
//!     .with(Length::between(2, 20))
//!     .with(Regex::new("^[a-z]")?);
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use tracing::{debug, trace};

use crate::error::{Invalid, SchemaError};
use crate::message::Message;
use crate::node::SchemaNode;
use crate::value::Value;

/// A rule checked against a deserialized value.
pub trait Validate: Send + Sync {
    /// Returns `Err` when `value` violates the rule.
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid>;
}

impl<F> Validate for F
where
    F: Fn(&SchemaNode, &Value) -> Result<(), Invalid> + Send + Sync,
{
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        self(node, value)
    }
}

/// Shared handle to a validator, as stored on a node.
#[derive(Clone)]
pub struct Validator(Arc<dyn Validate>);

impl Validator {
    /// Wrap any validator.
    pub fn new(validator: impl Validate + 'static) -> Self {
        Self(Arc::new(validator))
    }

    /// Wrap a closure taking the node and the value.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&SchemaNode, &Value) -> Result<(), Invalid> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the wrapped validator.
    pub fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        self.0.validate(node, value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

macro_rules! into_validator {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Validator {
                fn from(v: $ty) -> Self {
                    Validator::new(v)
                }
            }
        )*
    };
}

into_validator!(Length, Range, Regex, Email, OneOf, All, Function);

/// Bounds on the length of a string (in characters) or collection.
#[derive(Debug, Clone, Default)]
pub struct Length {
    /// Minimum length, inclusive
    pub min: Option<usize>,
    /// Maximum length, inclusive
    pub max: Option<usize>,
}

impl Length {
    /// Length with optional bounds; no bound means always valid.
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// At least `min` items.
    pub fn at_least(min: usize) -> Self {
        Self::new(Some(min), None)
    }

    /// At most `max` items.
    pub fn at_most(max: usize) -> Self {
        Self::new(None, Some(max))
    }

    /// Between `min` and `max` items, inclusive.
    pub fn between(min: usize, max: usize) -> Self {
        Self::new(Some(min), Some(max))
    }
}

impl Validate for Length {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        let Some(len) = value.len() else {
            return Err(Invalid::new(
                node,
                Message::new("\"${val}\" has no length")
                    .with("val", value)
                    .with_code("type"),
            ));
        };
        if let Some(min) = self.min {
            if len < min {
                trace!(field = %node.name, len, min, "Length below minimum");
                return Err(Invalid::new(
                    node,
                    Message::new("Shorter than minimum length ${min}")
                        .with("min", min)
                        .with_code("min_length"),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                trace!(field = %node.name, len, max, "Length above maximum");
                return Err(Invalid::new(
                    node,
                    Message::new("Longer than maximum length ${max}")
                        .with("max", max)
                        .with_code("max_length"),
                ));
            }
        }
        Ok(())
    }
}

/// Bounds on an ordered value (numbers, strings, dates, times).
#[derive(Debug, Clone)]
pub struct Range {
    /// Minimum value, inclusive
    pub min: Option<Value>,
    /// Maximum value, inclusive
    pub max: Option<Value>,
    /// Template used when below `min`; `${val}`, `${min}`, `${max}` are filled in
    pub min_err: String,
    /// Template used when above `max`
    pub max_err: String,
}

impl Range {
    /// Range with optional bounds and the default messages.
    pub fn new(min: Option<Value>, max: Option<Value>) -> Self {
        Self {
            min,
            max,
            min_err: "${val} is less than minimum value ${min}".to_string(),
            max_err: "${val} is greater than maximum value ${max}".to_string(),
        }
    }

    /// Range between two bounds.
    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::new(Some(min.into()), Some(max.into()))
    }

    /// Override the below-minimum message.
    #[must_use]
    pub fn with_min_err(mut self, template: impl Into<String>) -> Self {
        self.min_err = template.into();
        self
    }

    /// Override the above-maximum message.
    #[must_use]
    pub fn with_max_err(mut self, template: impl Into<String>) -> Self {
        self.max_err = template.into();
        self
    }

    fn message(&self, template: &str, value: &Value) -> Message {
        let show = |bound: &Option<Value>| bound.as_ref().map(Value::to_string).unwrap_or_default();
        Message::new(template)
            .with("val", value)
            .with("min", show(&self.min))
            .with("max", show(&self.max))
            .with_code("range")
    }

    fn incomparable(&self, node: &SchemaNode, value: &Value, bound: &Value) -> Invalid {
        Invalid::new(
            node,
            Message::new("\"${val}\" cannot be compared with ${bound}")
                .with("val", value)
                .with("bound", bound)
                .with_code("type"),
        )
    }
}

impl Validate for Range {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        use std::cmp::Ordering;

        if let Some(min) = &self.min {
            match value.compare(min) {
                Some(Ordering::Less) => {
                    return Err(Invalid::new(node, self.message(&self.min_err, value)));
                }
                Some(_) => {}
                None => return Err(self.incomparable(node, value, min)),
            }
        }
        if let Some(max) = &self.max {
            match value.compare(max) {
                Some(Ordering::Greater) => {
                    return Err(Invalid::new(node, self.message(&self.max_err, value)));
                }
                Some(_) => {}
                None => return Err(self.incomparable(node, value, max)),
            }
        }
        Ok(())
    }
}

/// Requires the start of a string to match a pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    regex: regex::Regex,
    msg: Message,
}

impl Regex {
    /// Compile `pattern` with the default message.
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        Ok(Self::from_regex(regex::Regex::new(pattern)?))
    }

    /// Use an already compiled expression.
    pub fn from_regex(regex: regex::Regex) -> Self {
        Self {
            regex,
            msg: Message::new("String does not match expected pattern").with_code("pattern"),
        }
    }

    /// Override the failure message.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<Message>) -> Self {
        self.msg = msg.into().with_code("pattern");
        self
    }

    /// The pattern source.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    fn matches_start(&self, s: &str) -> bool {
        self.regex.find(s).is_some_and(|m| m.start() == 0)
    }
}

impl Validate for Regex {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        match value.as_str() {
            Some(s) if self.matches_start(s) => Ok(()),
            _ => {
                debug!(field = %node.name, pattern = %self.regex.as_str(), "Pattern mismatch");
                Err(Invalid::new(node, self.msg.clone()))
            }
        }
    }
}

static EMAIL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,4}$")
        .expect("email pattern is valid")
});

/// A [`Regex`] with a fixed email address pattern.
#[derive(Debug, Clone)]
pub struct Email(Regex);

impl Email {
    /// Email validator with the default message.
    pub fn new() -> Self {
        let mut regex = Regex::from_regex(EMAIL_RE.clone());
        regex.msg = Message::new("Invalid email address").with_code("email");
        Self(regex)
    }

    /// Override the failure message.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<Message>) -> Self {
        self.0.msg = msg.into().with_code("email");
        self
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl Validate for Email {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        self.0.validate(node, value)
    }
}

/// Requires the value to be one of a fixed set of choices.
#[derive(Debug, Clone)]
pub struct OneOf {
    choices: Vec<Value>,
}

impl OneOf {
    /// Accept exactly these values.
    pub fn new<V: Into<Value>>(choices: impl IntoIterator<Item = V>) -> Self {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validate for OneOf {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        if self.choices.contains(value) {
            return Ok(());
        }
        let choices: Vec<String> = self.choices.iter().map(Value::to_string).collect();
        Err(Invalid::new(
            node,
            Message::new("\"${val}\" is not one of ${choices}")
                .with("val", value)
                .with("choices", choices.join(", "))
                .with_code("one_of"),
        ))
    }
}

/// Runs every validator and reports all failures together.
#[derive(Debug, Clone, Default)]
pub struct All {
    validators: Vec<Validator>,
}

impl All {
    /// An empty composition, which always passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator.
    #[must_use]
    pub fn with(mut self, validator: impl Into<Validator>) -> Self {
        self.validators.push(validator.into());
        self
    }
}

impl FromIterator<Validator> for All {
    fn from_iter<I: IntoIterator<Item = Validator>>(iter: I) -> Self {
        Self {
            validators: iter.into_iter().collect(),
        }
    }
}

impl Validate for All {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        let msgs: Vec<Message> = self
            .validators
            .iter()
            .filter_map(|v| v.validate(node, value).err())
            .flat_map(|err| err.messages().into_iter().cloned().collect::<Vec<_>>())
            .collect();
        if msgs.is_empty() {
            Ok(())
        } else {
            debug!(field = %node.name, failures = msgs.len(), "Composite validation failed");
            Err(Invalid::with_messages(node, msgs))
        }
    }
}

/// Outcome of a [`Function`] predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The value is valid
    Pass,
    /// The value is invalid; use the validator's message
    Fail,
    /// The value is invalid; use this message
    FailWith(String),
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok { Verdict::Pass } else { Verdict::Fail }
    }
}

impl From<&str> for Verdict {
    fn from(msg: &str) -> Self {
        Verdict::from(msg.to_string())
    }
}

impl From<String> for Verdict {
    fn from(msg: String) -> Self {
        if msg.is_empty() {
            Verdict::Fail
        } else {
            Verdict::FailWith(msg)
        }
    }
}

impl From<Value> for Verdict {
    fn from(value: Value) -> Self {
        match value {
            Value::Str(s) => Verdict::from(s),
            other => Verdict::from(other.is_truthy()),
        }
    }
}

type Predicate = Arc<dyn Fn(&Value) -> Verdict + Send + Sync>;

/// Validator backed by a predicate on the value.
#[derive(Clone)]
pub struct Function {
    function: Predicate,
    message: String,
}

impl Function {
    /// Wrap `function`; a falsy result fails with "Invalid value", a
    /// non-empty string result fails with that string.
    pub fn new<F, R>(function: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: Into<Verdict>,
    {
        Self {
            function: Arc::new(move |value| function(value).into()),
            message: "Invalid value".to_string(),
        }
    }

    /// Override the default failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl Validate for Function {
    fn validate(&self, node: &SchemaNode, value: &Value) -> Result<(), Invalid> {
        match (self.function)(value) {
            Verdict::Pass => Ok(()),
            Verdict::Fail => Err(Invalid::new(
                node,
                Message::new(self.message.as_str())
                    .with("val", value)
                    .with_code("custom"),
            )),
            Verdict::FailWith(msg) => Err(Invalid::new(node, Message::new(msg).with_code("custom"))),
        }
    }
}
