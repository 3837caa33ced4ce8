//! Named global objects resolved through a registry.
//!
//! Objects are registered under their full dotted path
//! (`package.module.attr`). [`GlobalObject`] accepts two spellings of a
//! path on deserialize:
//!
//! - colon style `package.module:attr`, where a leading `.` or `:` is
//!   relative to the configured package
//! - dotted style `package.module.attr`, where each leading dot climbs one
//!   package level

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Invalid;
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::SchemaType;
use crate::value::Value;

/// Handle to a registered object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlobalRef {
    path: String,
    name: String,
}

impl GlobalRef {
    /// Reference named by the last component of `path`.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into().replace(':', ".");
        let name = path.rsplit('.').next().unwrap_or_default().to_string();
        Self { path, name }
    }

    /// Full dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Short name, as produced by serialization.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registry of the objects a [`GlobalObject`] may resolve.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<String, GlobalRef>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object under its dotted path.
    pub fn register(&mut self, path: impl Into<String>) -> GlobalRef {
        let obj = GlobalRef::new(path);
        self.objects.insert(obj.path.clone(), obj.clone());
        obj
    }

    /// Builder form of [`ObjectRegistry::register`].
    #[must_use]
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.register(path);
        self
    }

    /// Look up an absolute path in either spelling.
    pub fn resolve(&self, path: &str) -> Option<GlobalRef> {
        self.objects.get(&path.replace(':', ".")).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// A reference to a registered object, serialized as its name.
#[derive(Debug, Clone)]
pub struct GlobalObject {
    registry: Arc<ObjectRegistry>,
    package: Option<String>,
}

impl GlobalObject {
    /// Resolve names against `registry`; relative names need `package`.
    pub fn new(registry: Arc<ObjectRegistry>, package: Option<String>) -> Self {
        Self { registry, package }
    }

    fn relative_error(node: &SchemaNode, value: &str) -> Invalid {
        Invalid::new(
            node,
            Message::new("relative name \"${val}\" irresolveable without package")
                .with("val", value)
                .with_code("invalid"),
        )
    }

    fn colon_style(&self, node: &SchemaNode, value: &str) -> Result<Option<String>, Invalid> {
        if !(value.starts_with('.') || value.starts_with(':')) {
            return Ok(Some(value.to_string()));
        }
        let package = self
            .package
            .as_deref()
            .ok_or_else(|| Self::relative_error(node, value))?;
        if value == "." || value == ":" {
            Ok(Some(package.to_string()))
        } else {
            Ok(Some(format!("{}{}", package, value)))
        }
    }

    fn dotted_style(&self, node: &SchemaNode, value: &str) -> Result<Option<String>, Invalid> {
        let package = self.package.as_deref();
        if value == "." {
            return package
                .map(|p| Some(p.to_string()))
                .ok_or_else(|| Self::relative_error(node, value));
        }
        let mut name: Vec<&str> = value.split('.').collect();
        if !name[0].is_empty() {
            return Ok(Some(value.to_string()));
        }
        let mut module: Vec<&str> = package
            .ok_or_else(|| Self::relative_error(node, value))?
            .split('.')
            .collect();
        name.remove(0);
        while name.first().is_some_and(|n| n.is_empty()) {
            if module.pop().is_none() {
                return Ok(None);
            }
            name.remove(0);
        }
        module.extend(name);
        Ok(Some(module.join(".")))
    }
}

impl SchemaType for GlobalObject {
    fn name(&self) -> &'static str {
        "global_object"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        match appstruct {
            Value::Null => Ok(Value::Null),
            Value::Object(obj) => Ok(Value::str(obj.name())),
            other => Err(Invalid::new(
                node,
                Message::new("\"${val}\" has no name")
                    .with("val", other)
                    .with_code("type"),
            )),
        }
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if !cstruct.is_truthy() {
            return Ok(Value::Null);
        }
        let Some(value) = cstruct.as_str() else {
            return Err(Invalid::new(
                node,
                Message::new("\"${val}\" is not a string")
                    .with("val", cstruct)
                    .with_code("type"),
            ));
        };
        let path = if value.contains(':') {
            self.colon_style(node, value)?
        } else {
            self.dotted_style(node, value)?
        };
        path.and_then(|p| self.registry.resolve(&p))
            .map(Value::Object)
            .ok_or_else(|| {
                Invalid::new(
                    node,
                    Message::new("The dotted name \"${name}\" cannot be imported")
                        .with("name", value)
                        .with_code("invalid"),
                )
            })
    }
}
