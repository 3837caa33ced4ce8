//! Variable sized collections: [`Set`] and [`List`].
//!
//! Both pass values through on serialize and reject an empty result on
//! deserialize unless `allow_empty` is set.

use crate::error::Invalid;
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::SchemaType;
use crate::value::{Value, ValueSet};

fn not_iterable(node: &SchemaNode, value: &Value) -> Invalid {
    Invalid::new(
        node,
        Message::new("${value} is not iterable")
            .with("value", value)
            .with_code("type"),
    )
}

/// An unordered collection of distinct items.
#[derive(Debug, Clone, Copy, Default)]
pub struct Set {
    pub allow_empty: bool,
}

impl Set {
    pub fn new(allow_empty: bool) -> Self {
        Self { allow_empty }
    }
}

impl SchemaType for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn serialize(&self, _node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        Ok(appstruct.clone())
    }

    /// Mappings yield their keys; strings and other scalars are not iterable.
    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if cstruct.is_absent() {
            return Ok(Value::Null);
        }
        let items = cstruct
            .iter_items()
            .ok_or_else(|| not_iterable(node, cstruct))?;
        let set: ValueSet = items.into_iter().collect();
        if set.is_empty() && !self.allow_empty {
            return Err(Invalid::required(node));
        }
        Ok(Value::Set(set))
    }
}

/// An ordered list of items.
#[derive(Debug, Clone, Copy, Default)]
pub struct List {
    pub allow_empty: bool,
}

impl List {
    pub fn new(allow_empty: bool) -> Self {
        Self { allow_empty }
    }
}

impl SchemaType for List {
    fn name(&self) -> &'static str {
        "list"
    }

    fn serialize(&self, _node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        Ok(appstruct.clone())
    }

    /// A single string becomes a one element list.
    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if cstruct.is_absent() {
            return Ok(Value::Null);
        }
        let items = match cstruct {
            Value::Str(_) => vec![cstruct.clone()],
            Value::List(items) | Value::Tuple(items) => items.clone(),
            other => return Err(not_iterable(node, other)),
        };
        if items.is_empty() && !self.allow_empty {
            return Err(Invalid::required(node));
        }
        Ok(Value::List(items))
    }
}
