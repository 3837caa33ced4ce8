//! Composite coercers: [`Mapping`] and [`Tuple`].
//!
//! Both walk the node's children and collect every child failure into one
//! parent [`Invalid`], recording the child's index as its position.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Invalid, SchemaError};
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::{FlatMap, SchemaType, split_path};
use crate::value::{Value, ValueMap};

/// Policy for input keys that match no child of a [`Mapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unknown {
    /// Drop unknown keys
    #[default]
    Ignore,
    /// Fail with an "Unrecognized keys" error
    Raise,
    /// Copy unknown keys into the result unchanged
    Preserve,
}

impl FromStr for Unknown {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Unknown::Ignore),
            "raise" => Ok(Unknown::Raise),
            "preserve" => Ok(Unknown::Preserve),
            other => Err(SchemaError::UnknownOption(format!(
                "unknown must be one of ignore, raise, preserve, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unknown::Ignore => "ignore",
            Unknown::Raise => "raise",
            Unknown::Preserve => "preserve",
        };
        f.write_str(s)
    }
}

/// A string keyed mapping whose entries are the node's children.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mapping {
    pub unknown: Unknown,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping with the given unknown-key policy.
    pub fn with_unknown(unknown: Unknown) -> Self {
        Self { unknown }
    }

    fn validate<'a>(&self, node: &SchemaNode, value: &'a Value) -> Result<&'a ValueMap, Invalid> {
        value.as_map().ok_or_else(|| {
            Invalid::new(
                node,
                Message::new("\"${val}\" is not a mapping type: ${err}")
                    .with("val", value)
                    .with("err", format!("{} object is not a mapping", value.kind()))
                    .with_code("type"),
            )
        })
    }

    fn apply<F>(&self, node: &SchemaNode, value: &Value, callback: F) -> Result<Value, Invalid>
    where
        F: Fn(&SchemaNode, &Value) -> Result<Value, Invalid>,
    {
        let mut remaining = self.validate(node, value)?.clone();
        let mut error: Option<Invalid> = None;
        let mut result = ValueMap::new();

        for (num, subnode) in node.children.iter().enumerate() {
            let subval = remaining.remove(&subnode.name).unwrap_or_default();
            match callback(subnode, &subval) {
                Ok(v) => {
                    result.insert(subnode.name.clone(), v);
                }
                Err(e) => error.get_or_insert_with(|| Invalid::bare(node)).add(e, Some(num)),
            }
        }
        trace!(
            node = %node.name,
            children = node.children.len(),
            failed = error.as_ref().map_or(0, |e| e.children.len()),
            "Mapping children processed"
        );

        match self.unknown {
            Unknown::Raise if !remaining.is_empty() => {
                return Err(Invalid::new(
                    node,
                    Message::new("Unrecognized keys in mapping: \"${val}\"")
                        .with("val", Value::Map(remaining))
                        .with_code("structure"),
                ));
            }
            Unknown::Preserve => result.extend(remaining),
            _ => {}
        }

        match error {
            Some(error) => Err(error),
            None => Ok(Value::Map(result)),
        }
    }
}

impl SchemaType for Mapping {
    fn name(&self) -> &'static str {
        "mapping"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        let empty = Value::Map(ValueMap::new());
        let appstruct = if appstruct.is_null() { &empty } else { appstruct };
        self.apply(node, appstruct, |subnode, subval| subnode.serialize(subval))
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if cstruct.is_null() {
            return Ok(Value::Null);
        }
        let formstruct = formstruct.unwrap_or(cstruct);
        self.apply(node, cstruct, |subnode, subval| {
            subnode.deserialize_with(subval, Some(formstruct))
        })
    }

    fn flatten(
        &self,
        node: &SchemaNode,
        appstruct: &Value,
        prefix: &str,
    ) -> Result<FlatMap, SchemaError> {
        let map = match appstruct {
            Value::Map(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(SchemaError::Structure(format!(
                    "{} is not a mapping at {:?}",
                    other.kind(),
                    node.name
                )));
            }
        };
        let selfprefix = child_prefix(prefix, &node.name);
        let mut result = FlatMap::new();
        for subnode in &node.children {
            let substruct = map
                .and_then(|m| m.get(&subnode.name))
                .cloned()
                .unwrap_or_default();
            result.extend(subnode.typ().flatten(subnode, &substruct, &selfprefix)?);
        }
        Ok(result)
    }

    fn unflatten(
        &self,
        node: &SchemaNode,
        paths: &[String],
        fstruct: &FlatMap,
    ) -> Result<Value, SchemaError> {
        unflatten_mapping(node, paths, fstruct).map(Value::Map)
    }

    fn get_value(
        &self,
        node: &SchemaNode,
        appstruct: &Value,
        path: &str,
    ) -> Result<Value, SchemaError> {
        let map = appstruct.as_map().ok_or_else(|| not_a_container(node, appstruct))?;
        let (name, rest) = split_path(path);
        let sub = map
            .get(name)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))?;
        match rest {
            None => Ok(sub.clone()),
            Some(rest) => {
                let subnode = node.child(name)?;
                subnode.typ().get_value(subnode, sub, rest)
            }
        }
    }

    fn set_value(
        &self,
        node: &SchemaNode,
        appstruct: Value,
        path: &str,
        value: Value,
    ) -> Result<Value, SchemaError> {
        let Value::Map(mut map) = appstruct else {
            return Err(not_a_container(node, &appstruct));
        };
        match split_path(path) {
            (name, None) => {
                map.insert(name.to_string(), value);
            }
            (name, Some(rest)) => {
                let subnode = node.child(name)?;
                let next = map
                    .remove(name)
                    .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))?;
                let updated = subnode.typ().set_value(subnode, next, rest, value)?;
                map.insert(name.to_string(), updated);
            }
        }
        Ok(Value::Map(map))
    }
}

/// A fixed length sequence addressed by position.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuple;

impl Tuple {
    fn validate<'a>(&self, node: &SchemaNode, value: &'a Value) -> Result<&'a [Value], Invalid> {
        let items = value.as_slice().ok_or_else(|| {
            Invalid::new(
                node,
                Message::new("\"${val}\" is not iterable")
                    .with("val", value)
                    .with_code("type"),
            )
        })?;
        if items.len() != node.children.len() {
            return Err(Invalid::new(
                node,
                Message::new(
                    "\"${val}\" has an incorrect number of elements (expected ${exp}, was ${was})",
                )
                .with("val", value)
                .with("exp", node.children.len())
                .with("was", items.len())
                .with_code("structure"),
            ));
        }
        Ok(items)
    }

    fn apply<F>(&self, node: &SchemaNode, value: &Value, callback: F) -> Result<Value, Invalid>
    where
        F: Fn(&SchemaNode, &Value) -> Result<Value, Invalid>,
    {
        let items = self.validate(node, value)?;
        let mut error: Option<Invalid> = None;
        let mut result = Vec::with_capacity(items.len());

        for (num, (subnode, subval)) in node.children.iter().zip(items).enumerate() {
            match callback(subnode, subval) {
                Ok(v) => result.push(v),
                Err(e) => error.get_or_insert_with(|| Invalid::bare(node)).add(e, Some(num)),
            }
        }

        match error {
            Some(error) => Err(error),
            None => Ok(Value::Tuple(result)),
        }
    }

    fn index_of(node: &SchemaNode, name: &str) -> Result<usize, SchemaError> {
        node.children
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))
    }
}

impl SchemaType for Tuple {
    fn name(&self) -> &'static str {
        "tuple"
    }

    fn is_positional(&self) -> bool {
        true
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_absent() {
            return Ok(Value::Null);
        }
        self.apply(node, appstruct, |subnode, subval| subnode.serialize(subval))
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if cstruct.is_null() {
            return Ok(Value::Null);
        }
        let formstruct = formstruct.unwrap_or(cstruct);
        self.apply(node, cstruct, |subnode, subval| {
            subnode.deserialize_with(subval, Some(formstruct))
        })
    }

    fn flatten(
        &self,
        node: &SchemaNode,
        appstruct: &Value,
        prefix: &str,
    ) -> Result<FlatMap, SchemaError> {
        let items = appstruct
            .as_slice()
            .ok_or_else(|| not_a_container(node, appstruct))?;
        let selfprefix = child_prefix(prefix, &node.name);
        let mut result = FlatMap::new();
        for (num, subnode) in node.children.iter().enumerate() {
            let substruct = items.get(num).ok_or_else(|| {
                SchemaError::Structure(format!("{:?} has no element {}", node.name, num))
            })?;
            result.extend(subnode.typ().flatten(subnode, substruct, &selfprefix)?);
        }
        Ok(result)
    }

    fn unflatten(
        &self,
        node: &SchemaNode,
        paths: &[String],
        fstruct: &FlatMap,
    ) -> Result<Value, SchemaError> {
        let mut mapstruct = unflatten_mapping(node, paths, fstruct)?;
        node.children
            .iter()
            .map(|subnode| {
                mapstruct
                    .remove(&subnode.name)
                    .ok_or_else(|| SchemaError::KeyNotFound(subnode.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Tuple)
    }

    fn get_value(
        &self,
        node: &SchemaNode,
        appstruct: &Value,
        path: &str,
    ) -> Result<Value, SchemaError> {
        let items = appstruct
            .as_slice()
            .ok_or_else(|| not_a_container(node, appstruct))?;
        let (name, rest) = split_path(path);
        let index = Self::index_of(node, name)?;
        let sub = items
            .get(index)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))?;
        match rest {
            None => Ok(sub.clone()),
            Some(rest) => {
                let subnode = &node.children[index];
                subnode.typ().get_value(subnode, sub, rest)
            }
        }
    }

    fn set_value(
        &self,
        node: &SchemaNode,
        appstruct: Value,
        path: &str,
        value: Value,
    ) -> Result<Value, SchemaError> {
        let mut items = match appstruct {
            Value::Tuple(items) | Value::List(items) => items,
            other => return Err(not_a_container(node, &other)),
        };
        let (name, rest) = split_path(path);
        let index = Self::index_of(node, name)?;
        let slot = items
            .get_mut(index)
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))?;
        *slot = match rest {
            None => value,
            Some(rest) => {
                let subnode = &node.children[index];
                subnode
                    .typ()
                    .set_value(subnode, std::mem::take(slot), rest, value)?
            }
        };
        Ok(Value::Tuple(items))
    }
}

fn child_prefix(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{}{}.", prefix, name)
    }
}

fn not_a_container(node: &SchemaNode, value: &Value) -> SchemaError {
    SchemaError::Structure(format!(
        "{} value cannot be traversed by {:?} ({})",
        value.kind(),
        node.name,
        node.typ().name()
    ))
}

/// Group sorted flat `paths` by their first component below `node` and
/// unflatten each group with the matching child.
pub fn unflatten_mapping(
    node: &SchemaNode,
    paths: &[String],
    fstruct: &FlatMap,
) -> Result<ValueMap, SchemaError> {
    let prefix = child_prefix("", &node.name);
    let mut appstruct = ValueMap::new();
    let mut subfstruct = FlatMap::new();
    let mut subpaths: Vec<String> = Vec::new();
    let mut curname: Option<String> = None;

    let mut flush = |name: &str, subpaths: &mut Vec<String>, subfstruct: &mut FlatMap| {
        let subnode = node.child(name)?;
        let value = subnode.typ().unflatten(subnode, subpaths, subfstruct)?;
        appstruct.insert(name.to_string(), value);
        subpaths.clear();
        subfstruct.clear();
        Ok::<(), SchemaError>(())
    };

    for path in paths {
        if *path == node.name {
            continue;
        }
        let subpath = path
            .strip_prefix(prefix.as_str())
            .ok_or_else(|| SchemaError::Structure(format!("Bad node: {}", path)))?;
        let (name, _) = split_path(subpath);
        match &curname {
            None => curname = Some(name.to_string()),
            Some(current) if current != name => {
                flush(current, &mut subpaths, &mut subfstruct)?;
                curname = Some(name.to_string());
            }
            Some(_) => {}
        }
        let value = fstruct
            .get(path)
            .cloned()
            .ok_or_else(|| SchemaError::KeyNotFound(path.clone()))?;
        subfstruct.insert(subpath.to_string(), value);
        subpaths.push(subpath.to_string());
    }
    if let Some(current) = &curname {
        flush(current, &mut subpaths, &mut subfstruct)?;
    }
    Ok(appstruct)
}
