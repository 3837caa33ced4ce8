//! Type coercers attached to schema nodes.
//!
//! Every coercer converts in both directions:
//!
//! - `serialize`: appstruct (typed application value) to cstruct (wire value)
//! - `deserialize`: cstruct to appstruct, returning [`Value::Null`] for
//!   absent input so the node's missing-value logic decides what happens
//!
//! Calls are pure functions of their arguments; coercers hold only
//! configuration and are never mutated by a call.

use std::fmt::Debug;

use crate::error::{Invalid, SchemaError};
use crate::node::SchemaNode;
use crate::value::{Value, ValueMap};

pub mod collection;
pub mod confirm;
pub mod file;
pub mod object;
pub mod scalar;
pub mod structural;
pub mod temporal;

pub use collection::{List, Set};
pub use confirm::Confirmed;
pub use file::FileData;
pub use object::{GlobalObject, GlobalRef, ObjectRegistry};
pub use scalar::{Boolean, Decimal, Encoding, Float, Integer, Str};
pub use structural::{Mapping, Tuple, Unknown};
pub use temporal::{Date, DateTime, Time};

/// Flattened representation: dotted path to leaf value.
pub type FlatMap = ValueMap;

/// Conversion strategy between cstructs and appstructs.
pub trait SchemaType: Send + Sync + Debug {
    /// Short type name, used in logs.
    fn name(&self) -> &'static str;

    /// Whether children are addressed by index rather than by name.
    fn is_positional(&self) -> bool {
        false
    }

    /// Convert an appstruct into a cstruct.
    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid>;

    /// Convert a cstruct into an appstruct.
    ///
    /// `formstruct` is the whole submission, for coercers that look at
    /// sibling values.
    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        formstruct: Option<&Value>,
    ) -> Result<Value, Invalid>;

    /// Flatten `appstruct` into dotted paths below `prefix`.
    fn flatten(
        &self,
        node: &SchemaNode,
        appstruct: &Value,
        prefix: &str,
    ) -> Result<FlatMap, SchemaError> {
        let mut result = FlatMap::new();
        result.insert(format!("{}{}", prefix, node.name), appstruct.clone());
        Ok(result)
    }

    /// Rebuild a value from the sorted `paths` of `fstruct`.
    fn unflatten(
        &self,
        node: &SchemaNode,
        paths: &[String],
        fstruct: &FlatMap,
    ) -> Result<Value, SchemaError> {
        if paths.len() != 1 || paths[0] != node.name {
            return Err(SchemaError::Structure(format!(
                "expected the single path {:?} for leaf node, got {:?}",
                node.name, paths
            )));
        }
        fstruct
            .get(&node.name)
            .cloned()
            .ok_or_else(|| SchemaError::KeyNotFound(node.name.clone()))
    }

    /// Read the value at a dotted `path` inside `appstruct`.
    fn get_value(
        &self,
        node: &SchemaNode,
        _appstruct: &Value,
        _path: &str,
    ) -> Result<Value, SchemaError> {
        Err(SchemaError::LeafNode(node.name.clone()))
    }

    /// Write `value` at a dotted `path`, returning the updated appstruct.
    fn set_value(
        &self,
        node: &SchemaNode,
        _appstruct: Value,
        _path: &str,
        _value: Value,
    ) -> Result<Value, SchemaError> {
        Err(SchemaError::LeafNode(node.name.clone()))
    }
}

/// Split `a.b.c` into `("a", Some("b.c"))`.
pub(crate) fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}
