//! Error types for schema operations.
//!
//! Two families live here:
//!
//! - [`Invalid`]: the tree shaped failure returned by coercers, validators
//!   and node deserialization. Composite types collect every child failure
//!   into one parent, so a caller sees all problems of a submission at once.
//! - [`SchemaError`]: failures of tree navigation, construction and
//!   configuration, which are not about user input.
//!
//! # Example
//!
//! ```rust,ignore
//! match schema.deserialize(&cstruct) {
//!     Ok(appstruct) => save(appstruct),
//!     Err(err) => {
//!         for (field, msg) in err.asdict() {
//!             println!("{field}: {msg}");
//!         }
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigValidationError;
use crate::message::Message;
use crate::node::SchemaNode;
use crate::value::Value;

/// Result alias for navigation and construction operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors unrelated to the validity of user input.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No child or path component with this name exists.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A validation failure surfaced through a navigation API.
    #[error("invalid: {0}")]
    Invalid(#[from] Invalid),

    /// A path operation was attempted on a scalar type.
    #[error("{0} is a leaf node")]
    LeafNode(String),

    /// Flattened or nested input does not have the expected shape.
    #[error("malformed structure: {0}")]
    Structure(String),

    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Factory configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),

    /// An option string could not be parsed.
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

/// Snapshot of the schema node an [`Invalid`] belongs to.
///
/// Holds the node's name and positional flag plus the same data for its
/// direct children, which is what error addressing needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRef {
    /// Node name
    pub name: String,
    /// Whether the node's type addresses children by index
    pub positional: bool,
    /// Direct children (their own children are not captured)
    pub children: Vec<NodeRef>,
}

impl NodeRef {
    /// Capture a node and its direct children.
    pub fn of(node: &SchemaNode) -> Self {
        Self {
            name: node.name.clone(),
            positional: node.typ().is_positional(),
            children: node.children.iter().map(NodeRef::shallow).collect(),
        }
    }

    fn shallow(node: &SchemaNode) -> Self {
        Self {
            name: node.name.clone(),
            positional: node.typ().is_positional(),
            children: Vec::new(),
        }
    }
}

/// One message or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMsg {
    /// A single message
    One(Message),
    /// Messages collected from several validators
    Many(Vec<Message>),
}

/// A validation failure, possibly with nested child failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalid {
    /// The node that failed, if any
    pub node: Option<NodeRef>,
    /// Failure message(s)
    pub msg: Option<ErrorMsg>,
    /// The offending value
    pub value: Option<Value>,
    /// Child failures in the order they were added
    pub children: Vec<Invalid>,
    /// Position assigned by the parent
    pub pos: Option<usize>,
    /// Set when the parent addresses children by index
    pub positional: bool,
}

impl Invalid {
    /// Failure of `node` with a single message.
    pub fn new(node: &SchemaNode, msg: impl Into<Message>) -> Self {
        Self {
            msg: Some(ErrorMsg::One(msg.into())),
            ..Self::bare(node)
        }
    }

    /// Failure of `node` without a message, used as a parent for child failures.
    pub fn bare(node: &SchemaNode) -> Self {
        Self {
            node: Some(NodeRef::of(node)),
            msg: None,
            value: None,
            children: Vec::new(),
            pos: None,
            positional: false,
        }
    }

    /// Failure not tied to any node.
    pub fn detached(msg: impl Into<Message>) -> Self {
        Self {
            node: None,
            msg: Some(ErrorMsg::One(msg.into())),
            value: None,
            children: Vec::new(),
            pos: None,
            positional: false,
        }
    }

    /// The "Required" failure for `node`.
    pub fn required(node: &SchemaNode) -> Self {
        Self::new(node, Message::new("Required").with_code("required"))
    }

    /// Failure of `node` carrying several messages.
    pub fn with_messages(node: &SchemaNode, msgs: Vec<Message>) -> Self {
        Self {
            msg: Some(ErrorMsg::Many(msgs)),
            ..Self::bare(node)
        }
    }

    /// Attach the offending value.
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Append a child failure.
    ///
    /// The child is marked positional when this failure's node is positional.
    pub fn add(&mut self, mut exc: Invalid, pos: Option<usize>) {
        if self.node.as_ref().is_some_and(|n| n.positional) {
            exc.positional = true;
        }
        if pos.is_some() {
            exc.pos = pos;
        }
        self.children.push(exc);
    }

    /// Messages of this failure alone (not its children).
    pub fn messages(&self) -> Vec<&Message> {
        match &self.msg {
            None => Vec::new(),
            Some(ErrorMsg::One(m)) => vec![m],
            Some(ErrorMsg::Many(ms)) => ms.iter().collect(),
        }
    }

    /// Add a failure for the child of this failure's node named `name`.
    pub fn set_child(&mut self, name: &str, msg: impl Into<Message>) -> Result<(), SchemaError> {
        let (pos, child) = self
            .node
            .as_ref()
            .and_then(|n| n.children.iter().enumerate().find(|(_, c)| c.name == name))
            .map(|(pos, c)| (pos, c.clone()))
            .ok_or_else(|| SchemaError::KeyNotFound(name.to_string()))?;
        let exc = Invalid {
            node: Some(child),
            msg: Some(ErrorMsg::One(msg.into())),
            value: None,
            children: Vec::new(),
            pos: None,
            positional: false,
        };
        self.add(exc, Some(pos));
        Ok(())
    }

    /// Name of this failure within its parent: the position when positional,
    /// else the node name.
    pub fn keyname(&self) -> String {
        if self.positional {
            if let Some(pos) = self.pos {
                return pos.to_string();
            }
        }
        self.node.as_ref().map(|n| n.name.clone()).unwrap_or_default()
    }

    /// Lazily iterate every root-to-leaf path, depth first.
    pub fn paths(&self) -> Paths<'_> {
        Paths {
            stack: vec![vec![self]],
        }
    }

    /// Flatten the tree into dotted keys and `"; "` joined messages.
    pub fn asdict(&self) -> BTreeMap<String, String> {
        self.asdict_with(Message::interpolate)
    }

    /// Like [`Invalid::asdict`], rendering each message through `translate`.
    pub fn asdict_with<F>(&self, translate: F) -> BTreeMap<String, String>
    where
        F: Fn(&Message) -> String,
    {
        let mut errors = BTreeMap::new();
        for path in self.paths() {
            let (key, msgs) = flatten_path(&path, &translate);
            errors.insert(key, msgs.join("; "));
        }
        errors
    }

    /// One [`FieldError`] per path, carrying the code of the deepest message.
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.paths()
            .map(|path| {
                let (field, msgs) = flatten_path(&path, &Message::interpolate);
                let code = path
                    .iter()
                    .rev()
                    .flat_map(|exc| exc.messages())
                    .map(|m| m.code.clone())
                    .next()
                    .unwrap_or_else(|| "invalid".to_string());
                FieldError::new(field, msgs.join("; "), code)
            })
            .collect()
    }
}

fn flatten_path<F>(path: &[&Invalid], translate: &F) -> (String, Vec<String>)
where
    F: Fn(&Message) -> String,
{
    let mut keyparts = Vec::new();
    let mut msgs = Vec::new();
    for exc in path {
        msgs.extend(
            exc.messages()
                .into_iter()
                .map(translate)
                .filter(|m| !m.is_empty()),
        );
        let keyname = exc.keyname();
        if !keyname.is_empty() {
            keyparts.push(keyname);
        }
    }
    (keyparts.join("."), msgs)
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .asdict()
            .iter()
            .map(|(k, v)| format!("'{}': '{}'", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl std::error::Error for Invalid {}

/// Iterator over the root-to-leaf paths of an [`Invalid`] tree.
pub struct Paths<'a> {
    stack: Vec<Vec<&'a Invalid>>,
}

impl<'a> Iterator for Paths<'a> {
    type Item = Vec<&'a Invalid>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.stack.pop() {
            let Some(last) = path.last().copied() else {
                continue;
            };
            if last.children.is_empty() {
                return Some(path);
            }
            for child in last.children.iter().rev() {
                let mut next = path.clone();
                next.push(child);
                self.stack.push(next);
            }
        }
        None
    }
}

/// Validation error for a single field, as handed to a forms layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path of the field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Error code identifying the type of validation failure
    pub code: String,
}

impl FieldError {
    /// Create a new field error
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}
