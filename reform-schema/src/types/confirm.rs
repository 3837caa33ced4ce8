//! Fields entered twice, such as passwords.

use std::sync::Arc;

use tracing::debug;

use crate::error::Invalid;
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::{SchemaType, Str};
use crate::value::Value;

/// Requires a field to equal its companion `<name><suffix>` entry in the
/// formstruct, then deserializes it with the inner type.
///
/// The companion is read from the formstruct on every call, so a shared
/// schema can be used by concurrent deserializations.
#[derive(Debug, Clone)]
pub struct Confirmed {
    inner: Arc<dyn SchemaType>,
    suffix: String,
    mismatch_message: String,
}

impl Default for Confirmed {
    fn default() -> Self {
        Self::new(Str::new())
    }
}

impl Confirmed {
    /// Confirm values of `inner` against `<name>-confirm`.
    pub fn new(inner: impl SchemaType + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            suffix: "-confirm".to_string(),
            mismatch_message: "Fields did not match".to_string(),
        }
    }

    /// Use another companion key suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Use another mismatch message.
    #[must_use]
    pub fn with_mismatch_message(mut self, message: impl Into<String>) -> Self {
        self.mismatch_message = message.into();
        self
    }

    /// Key of the companion value for `node`.
    pub fn confirm_key(&self, node: &SchemaNode) -> String {
        format!("{}{}", node.name, self.suffix)
    }
}

impl SchemaType for Confirmed {
    fn name(&self) -> &'static str {
        "confirmed"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        self.inner.serialize(node, appstruct)
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
        let key = self.confirm_key(node);
        let confirm = formstruct
            .and_then(Value::as_map)
            .and_then(|m| m.get(&key))
            .filter(|v| v.is_truthy())
            .cloned()
            .unwrap_or_else(|| Value::str(""));

        if (cstruct.is_truthy() || confirm.is_truthy()) && *cstruct != confirm {
            debug!(field = %node.name, confirm = %key, "Confirmation mismatch");
            return Err(Invalid::new(
                node,
                Message::new(self.mismatch_message.as_str()).with_code("mismatch"),
            )
            .with_value(cstruct.clone()));
        }
        if !cstruct.is_truthy() {
            return Ok(Value::Null);
        }
        self.inner.deserialize(node, cstruct, formstruct)
    }
}
