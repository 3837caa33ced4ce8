//! Declarative schema collection.
//!
//! Fields are registered as `(name, node)` pairs and ordered by the
//! nodes' construction order, so a schema reads in the order its nodes
//! were declared regardless of registration order.
//!
//! ```rust,ignore
//! let person = SchemaBuilder::new()
//!     .field("name", SchemaNode::new(Str::new()))
//!     .field("age", SchemaNode::new(Integer))
//!     .build();
//! ```

use tracing::trace;

use crate::node::SchemaNode;
use crate::types::{Mapping, Unknown};
use crate::validators::Validator;

/// Collects named nodes into a root [`Mapping`] node.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    name: String,
    unknown: Unknown,
    validator: Option<Validator>,
    fields: Vec<SchemaNode>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root node name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the unknown-key policy of the root mapping
    #[must_use]
    pub fn unknown(mut self, unknown: Unknown) -> Self {
        self.unknown = unknown;
        self
    }

    /// Set a validator on the root node
    #[must_use]
    pub fn validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    /// Declare a field. A field with the same name replaces the earlier one.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        let node = node.with_name(name);
        match self.fields.iter_mut().find(|f| f.name == node.name) {
            Some(existing) => *existing = node,
            None => self.fields.push(node),
        }
        self
    }

    /// Declare every child of `base`, as a derived schema would inherit them.
    #[must_use]
    pub fn inherit(self, base: &SchemaNode) -> Self {
        base.iter()
            .fold(self, |builder, child| builder.field(child.name.clone(), child.clone()))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the root mapping with fields in declaration order.
    #[must_use]
    pub fn build(self) -> SchemaNode {
        let mut fields = self.fields;
        fields.sort_by_key(SchemaNode::order);

        let mut root = SchemaNode::new(Mapping::with_unknown(self.unknown)).with_name(self.name);
        if let Some(validator) = self.validator {
            root = root.with_validator(validator);
        }
        trace!(fields = fields.len(), unknown = %self.unknown, "Schema declared");
        root.children = fields;
        root
    }
}
