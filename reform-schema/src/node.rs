//! The schema node tree.
//!
//! A [`SchemaNode`] pairs a type coercer with field metadata (name,
//! default, missing value, validator, preparer) and an ordered list of
//! children. Trees are treated as immutable templates: `serialize` and
//! `deserialize` only read the tree, and [`SchemaNode::bind`] works on a
//! clone.
//!
//! # Deferred attributes
//!
//! Attributes whose value depends on runtime context are stored as
//! [`Attr::Deferred`] and resolved by `bind`:
//!
//! ```rust,ignore
//! let node = SchemaNode::new(Date::new())
//!     .with_name("due")
//!     .defer_validator(|_, kw| {
//!         let today = kw.get("today").cloned().unwrap_or_default();
//!         Range::new(Some(today), None)
//!     });
//!
//! let bound = node.bind(&Bindings::new().with("today", today))?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::error::{Invalid, SchemaError, SchemaResult};
use crate::types::{FlatMap, SchemaType};
use crate::validators::Validator;
use crate::value::Value;

static ORDER: AtomicU64 = AtomicU64::new(0);

fn next_order() -> u64 {
    ORDER.fetch_add(1, Ordering::Relaxed)
}

/// Context passed to deferred attributes and `after_bind` callbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings(BTreeMap<String, Value>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A value computed from the node and the bindings at bind time.
pub struct Deferred<T>(Arc<dyn Fn(&SchemaNode, &Bindings) -> T + Send + Sync>);

impl<T> Deferred<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> T + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Compute the value.
    pub fn call(&self, node: &SchemaNode, kw: &Bindings) -> T {
        (self.0)(node, kw)
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// A node attribute: either a fixed value or one resolved at bind time.
#[derive(Debug, Clone)]
pub enum Attr<T> {
    Fixed(T),
    Deferred(Deferred<T>),
}

impl<T> Attr<T> {
    /// Attribute computed by `f` at bind time.
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> T + Send + Sync + 'static,
    {
        Attr::Deferred(Deferred::new(f))
    }

    /// The value, unless still deferred.
    pub fn fixed(&self) -> Option<&T> {
        match self {
            Attr::Fixed(v) => Some(v),
            Attr::Deferred(_) => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Attr::Deferred(_))
    }
}

impl<T> From<T> for Attr<T> {
    fn from(value: T) -> Self {
        Attr::Fixed(value)
    }
}

/// Deferred attributes are equal when they wrap the same function.
impl<T: PartialEq> PartialEq for Attr<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Attr::Fixed(a), Attr::Fixed(b)) => a == b,
            (Attr::Deferred(a), Attr::Deferred(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

/// What deserialization returns for an absent value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Missing {
    /// The field must be present
    #[default]
    Required,
    /// Substitute this value (returned without validation)
    Value(Value),
}

impl From<Value> for Missing {
    fn from(value: Value) -> Self {
        Missing::Value(value)
    }
}

/// Transform applied to a deserialized value before validation.
pub type Preparer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Callback run after a node's deferred attributes are resolved.
pub type AfterBind = Arc<dyn Fn(&mut SchemaNode, &Bindings) -> SchemaResult<()> + Send + Sync>;

/// One field of a schema, with its children.
#[derive(Clone)]
pub struct SchemaNode {
    typ: Arc<dyn SchemaType>,
    /// Name, unique among siblings
    pub name: String,
    /// Explicit title; derived from the name when unset
    pub title: Option<Attr<String>>,
    pub description: Attr<String>,
    /// Value serialized in place of an absent appstruct
    pub default: Attr<Value>,
    /// Value deserialized in place of an absent cstruct
    pub missing: Attr<Missing>,
    pub validator: Option<Attr<Validator>>,
    pub preparer: Option<Preparer>,
    /// Rendering hint, not interpreted by the schema
    pub widget: Option<Attr<serde_json::Value>>,
    pub after_bind: Option<AfterBind>,
    /// Framework specific metadata
    pub extra: BTreeMap<String, Attr<Value>>,
    order: u64,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    /// Create an unnamed node of the given type.
    pub fn new(typ: impl SchemaType + 'static) -> Self {
        Self::from_type(Arc::new(typ))
    }

    /// Create a node sharing an existing coercer.
    pub fn from_type(typ: Arc<dyn SchemaType>) -> Self {
        Self {
            typ,
            name: String::new(),
            title: None,
            description: Attr::Fixed(String::new()),
            default: Attr::Fixed(Value::Null),
            missing: Attr::Fixed(Missing::Required),
            validator: None,
            preparer: None,
            widget: None,
            after_bind: None,
            extra: BTreeMap::new(),
            order: next_order(),
            children: Vec::new(),
        }
    }

    /// The node's coercer.
    pub fn typ(&self) -> &dyn SchemaType {
        self.typ.as_ref()
    }

    /// Shared handle to the node's coercer.
    pub fn typ_arc(&self) -> Arc<dyn SchemaType> {
        Arc::clone(&self.typ)
    }

    /// Construction order, used to sort declared fields.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// The title, falling back to the name with underscores as spaces, title-cased.
    pub fn title(&self) -> String {
        match &self.title {
            Some(Attr::Fixed(title)) => title.clone(),
            _ => title_case(&self.name),
        }
    }

    /// True unless a missing value is configured. A deferred missing value
    /// counts as required until bound.
    pub fn is_required(&self) -> bool {
        matches!(
            self.missing,
            Attr::Fixed(Missing::Required) | Attr::Deferred(_)
        )
    }

    // Builders

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Attr::Fixed(title.into()));
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Attr::Fixed(description.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Attr::Fixed(default.into());
        self
    }

    /// Make the field optional, deserializing absent input to `missing`.
    #[must_use]
    pub fn with_missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Attr::Fixed(Missing::Value(missing.into()));
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(Attr::Fixed(validator.into()));
        self
    }

    #[must_use]
    pub fn with_preparer<F>(mut self, preparer: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.preparer = Some(Arc::new(preparer));
        self
    }

    #[must_use]
    pub fn with_widget(mut self, widget: serde_json::Value) -> Self {
        self.widget = Some(Attr::Fixed(widget));
        self
    }

    #[must_use]
    pub fn with_after_bind<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut SchemaNode, &Bindings) -> SchemaResult<()> + Send + Sync + 'static,
    {
        self.after_bind = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), Attr::Fixed(value.into()));
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    // Deferred builders

    #[must_use]
    pub fn defer_title<F>(mut self, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> String + Send + Sync + 'static,
    {
        self.title = Some(Attr::deferred(f));
        self
    }

    #[must_use]
    pub fn defer_description<F>(mut self, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> String + Send + Sync + 'static,
    {
        self.description = Attr::deferred(f);
        self
    }

    #[must_use]
    pub fn defer_default<F, V>(mut self, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.default = Attr::deferred(move |node, kw| f(node, kw).into());
        self
    }

    #[must_use]
    pub fn defer_missing<F, M>(mut self, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> M + Send + Sync + 'static,
        M: Into<Missing>,
    {
        self.missing = Attr::deferred(move |node, kw| f(node, kw).into());
        self
    }

    #[must_use]
    pub fn defer_validator<F, V>(mut self, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> V + Send + Sync + 'static,
        V: Into<Validator>,
    {
        self.validator = Some(Attr::deferred(move |node, kw| f(node, kw).into()));
        self
    }

    #[must_use]
    pub fn defer_widget<F>(mut self, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> serde_json::Value + Send + Sync + 'static,
    {
        self.widget = Some(Attr::deferred(f));
        self
    }

    #[must_use]
    pub fn defer_extra<F, V>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SchemaNode, &Bindings) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.extra
            .insert(key.into(), Attr::deferred(move |node, kw| f(node, kw).into()));
        self
    }

    /// Fixed value of an extra attribute.
    pub fn extra_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key).and_then(Attr::fixed)
    }

    // Conversion

    /// Serialize an appstruct; an absent (`null`) appstruct is replaced by
    /// the node's default. No validation is applied.
    pub fn serialize(&self, appstruct: &Value) -> Result<Value, Invalid> {
        trace!(node = %self.name, typ = self.typ.name(), "Serializing");
        let null = Value::Null;
        let appstruct = if appstruct.is_null() {
            self.default.fixed().unwrap_or(&null)
        } else {
            appstruct
        };
        self.typ.serialize(self, appstruct)
    }

    /// Deserialize and validate a root cstruct.
    ///
    /// The cstruct itself serves as the formstruct for cross-field checks.
    pub fn deserialize(&self, cstruct: &Value) -> Result<Value, Invalid> {
        self.deserialize_with(cstruct, None).inspect_err(|err| {
            let fields: Vec<String> = err.asdict().into_keys().collect();
            debug!(
                node = %self.name,
                error_count = fields.len(),
                fields = ?fields,
                "Deserialization failed"
            );
        })
    }

    /// Deserialize with an explicit formstruct.
    ///
    /// The preparer runs before the missing-value check. Absent results
    /// return the missing value without validation, or fail as required.
    pub fn deserialize_with(
        &self,
        cstruct: &Value,
        formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        trace!(node = %self.name, typ = self.typ.name(), "Deserializing");
        let mut appstruct = self.typ.deserialize(self, cstruct, formstruct)?;

        if let Some(preparer) = &self.preparer {
            appstruct = preparer(appstruct);
        }

        if appstruct.is_null() {
            return match &self.missing {
                Attr::Fixed(Missing::Value(value)) => Ok(value.clone()),
                _ => Err(Invalid::required(self)),
            };
        }

        if let Some(Attr::Fixed(validator)) = &self.validator {
            validator.validate(self, &appstruct)?;
        }
        Ok(appstruct)
    }

    // Binding

    /// Clone the tree and resolve every deferred attribute with `kw`.
    ///
    /// Children are bound before their parent; each node's `after_bind`
    /// runs once its own attributes are resolved. `self` is not modified.
    pub fn bind(&self, kw: &Bindings) -> SchemaResult<SchemaNode> {
        let mut cloned = self.clone();
        cloned.bind_in_place(kw)?;
        debug!(node = %self.name, bindings = kw.len(), "Schema bound");
        Ok(cloned)
    }

    fn bind_in_place(&mut self, kw: &Bindings) -> SchemaResult<()> {
        for child in &mut self.children {
            child.bind_in_place(kw)?;
        }

        if let Some(title) = &self.title {
            if let Some(v) = self.resolve(title, kw) {
                self.title = Some(Attr::Fixed(v));
            }
        }
        if let Some(v) = self.resolve(&self.description, kw) {
            self.description = Attr::Fixed(v);
        }
        if let Some(v) = self.resolve(&self.default, kw) {
            self.default = Attr::Fixed(v);
        }
        if let Some(v) = self.resolve(&self.missing, kw) {
            self.missing = Attr::Fixed(v);
        }
        if let Some(validator) = &self.validator {
            if let Some(v) = self.resolve(validator, kw) {
                self.validator = Some(Attr::Fixed(v));
            }
        }
        if let Some(widget) = &self.widget {
            if let Some(v) = self.resolve(widget, kw) {
                self.widget = Some(Attr::Fixed(v));
            }
        }
        let deferred_keys: Vec<String> = self
            .extra
            .iter()
            .filter(|(_, attr)| attr.is_deferred())
            .map(|(key, _)| key.clone())
            .collect();
        for key in deferred_keys {
            if let Some(v) = self.extra.get(&key).and_then(|attr| self.resolve(attr, kw)) {
                self.extra.insert(key, Attr::Fixed(v));
            }
        }

        if let Some(callback) = self.after_bind.clone() {
            debug!(node = %self.name, "Running after_bind");
            callback(self, kw)?;
        }
        Ok(())
    }

    fn resolve<T>(&self, attr: &Attr<T>, kw: &Bindings) -> Option<T> {
        match attr {
            Attr::Deferred(deferred) => Some(deferred.call(self, kw)),
            Attr::Fixed(_) => None,
        }
    }

    // Child access

    /// Append a child.
    pub fn add(&mut self, child: SchemaNode) {
        self.children.push(child);
    }

    /// First child named `name`.
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child named `name`, or a key-not-found error.
    pub fn child(&self, name: &str) -> SchemaResult<&SchemaNode> {
        self.get(name)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))
    }

    pub fn child_mut(&mut self, name: &str) -> SchemaResult<&mut SchemaNode> {
        self.children
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))
    }

    /// Remove and return the first child named `name`.
    pub fn remove(&mut self, name: &str) -> SchemaResult<SchemaNode> {
        let idx = self.position(name)?;
        Ok(self.children.remove(idx))
    }

    /// Put `node` in place of the child named `name`, renaming it to `name`.
    /// Returns the replaced child.
    pub fn replace(&mut self, name: &str, mut node: SchemaNode) -> SchemaResult<SchemaNode> {
        let idx = self.position(name)?;
        node.name = name.to_string();
        Ok(std::mem::replace(&mut self.children[idx], node))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaNode> {
        self.children.iter()
    }

    fn position(&self, name: &str) -> SchemaResult<usize> {
        self.children
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))
    }

    // Paths

    /// Flatten an appstruct into a dotted-path keyed mapping.
    pub fn flatten(&self, appstruct: &Value) -> SchemaResult<FlatMap> {
        self.typ.flatten(self, appstruct, "")
    }

    /// Inverse of [`SchemaNode::flatten`].
    pub fn unflatten(&self, fstruct: &FlatMap) -> SchemaResult<Value> {
        let paths: Vec<String> = fstruct.keys().cloned().collect();
        self.typ.unflatten(self, &paths, fstruct)
    }

    /// Read the value at `dotted_name` inside `appstruct`.
    pub fn get_value(&self, appstruct: &Value, dotted_name: &str) -> SchemaResult<Value> {
        self.typ.get_value(self, appstruct, dotted_name)
    }

    /// Write `value` at `dotted_name`, returning the updated appstruct.
    pub fn set_value(
        &self,
        appstruct: Value,
        dotted_name: &str,
        value: impl Into<Value>,
    ) -> SchemaResult<Value> {
        self.typ.set_value(self, appstruct, dotted_name, value.into())
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("name", &self.name)
            .field("typ", &self.typ)
            .field("missing", &self.missing)
            .field("order", &self.order)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a SchemaNode {
    type Item = &'a SchemaNode;
    type IntoIter = std::slice::Iter<'a, SchemaNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

/// `first_name` to `First Name`.
pub(crate) fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;
    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
