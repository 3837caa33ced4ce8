//! File upload data exchanged with an upload widget.

use crate::error::Invalid;
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::SchemaType;
use crate::value::{Value, ValueMap};

const REQUIRED_KEYS: [&str; 2] = ["filename", "uid"];
const OPTIONAL_KEYS: [&str; 4] = ["mimetype", "size", "fp", "preview_url"];

/// File data: a mapping with at least `filename` and `uid`.
///
/// Serialization completes partial file information with `mimetype`,
/// `size`, `fp` and `preview_url` (set to `None` when absent).
/// Deserialization hands the uploaded value back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileData;

impl SchemaType for FileData {
    fn name(&self) -> &'static str {
        "file"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_absent() {
            return Ok(Value::Null);
        }
        let Some(map) = appstruct.as_map() else {
            return Err(Invalid::new(
                node,
                Message::new("${value} is not a dictionary")
                    .with("value", appstruct)
                    .with_code("type"),
            ));
        };
        if let Some(key) = REQUIRED_KEYS.iter().find(|k| !map.contains_key(**k)) {
            return Err(Invalid::new(
                node,
                Message::new("${value} has no ${key} key")
                    .with("value", appstruct)
                    .with("key", key)
                    .with_code("structure"),
            ));
        }
        let result: ValueMap = REQUIRED_KEYS
            .iter()
            .chain(OPTIONAL_KEYS.iter())
            .map(|key| (key.to_string(), map.get(*key).cloned().unwrap_or(Value::None)))
            .collect();
        Ok(Value::Map(result))
    }

    fn deserialize(
        &self,
        _node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        Ok(cstruct.clone())
    }
}
