//! String, number and boolean coercers.

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{Invalid, SchemaError};
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::SchemaType;
use crate::value::Value;

/// Byte encoding used by [`Str`] for `Bytes` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    Ascii,
    Latin1,
}

impl Encoding {
    fn encode(self, s: &str) -> Result<Vec<u8>, String> {
        match self {
            Encoding::Utf8 => Ok(s.as_bytes().to_vec()),
            Encoding::Ascii => s
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        Ok(c as u8)
                    } else {
                        Err(format!("'ascii' codec can't encode character {:?}", c))
                    }
                })
                .collect(),
            Encoding::Latin1 => s
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c))
                        .map_err(|_| format!("'latin-1' codec can't encode character {:?}", c))
                })
                .collect(),
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String, String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string()),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(format!(
                    "'ascii' codec can't decode byte 0x{:02x} in position {}",
                    bytes[pos], pos
                )),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl FromStr for Encoding {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(SchemaError::UnknownOption(format!("encoding {}", other))),
        }
    }
}

/// A Unicode string.
///
/// Without an encoding, strings pass through and other values are
/// rendered with their display form. With an encoding, `serialize`
/// produces `Bytes` and `deserialize` decodes `Bytes` input.
#[derive(Debug, Clone, Default)]
pub struct Str {
    pub encoding: Option<Encoding>,
}

impl Str {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `encoding` for byte conversions.
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self {
            encoding: Some(encoding),
        }
    }

    fn text(&self, value: &Value) -> Result<String, String> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Bytes(b) => self.encoding.unwrap_or(Encoding::Utf8).decode(b),
            other => Ok(other.to_string()),
        }
    }
}

impl SchemaType for Str {
    fn name(&self) -> &'static str {
        "string"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_null() {
            return Ok(Value::Null);
        }
        let fail = |err: String| {
            Invalid::new(
                node,
                Message::new("\"${val}\" cannot be serialized: ${err}")
                    .with("val", appstruct)
                    .with("err", err)
                    .with_code("type"),
            )
        };
        let text = self.text(appstruct).map_err(fail)?;
        match self.encoding {
            None => Ok(Value::Str(text)),
            Some(encoding) => encoding.encode(&text).map(Value::Bytes).map_err(fail),
        }
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if matches!(cstruct, Value::Null | Value::None) {
            return Ok(Value::Null);
        }
        self.text(cstruct).map(Value::Str).map_err(|err| {
            Invalid::new(
                node,
                Message::new("${val} is not a string: ${err}")
                    .with("val", cstruct)
                    .with("err", err)
                    .with_code("type"),
            )
        })
    }
}

fn not_a_number(node: &SchemaNode, value: &Value) -> Invalid {
    Invalid::new(
        node,
        Message::new("\"${val}\" is not a number")
            .with("val", value)
            .with_code("type"),
    )
}

/// Shared absent-value handling of the numeric coercers.
///
/// `num` converts a value to the target numeric variant; its display form
/// is the wire string.
fn serialize_number(
    node: &SchemaNode,
    appstruct: &Value,
    num: impl Fn(&Value) -> Option<Value>,
) -> Result<Value, Invalid> {
    if appstruct.is_absent() {
        return Ok(Value::Null);
    }
    num(appstruct)
        .map(|n| Value::Str(n.to_string()))
        .ok_or_else(|| not_a_number(node, appstruct))
}

fn deserialize_number(
    node: &SchemaNode,
    cstruct: &Value,
    num: impl Fn(&Value) -> Option<Value>,
) -> Result<Value, Invalid> {
    if !cstruct.is_truthy() && !cstruct.is_zero_number() {
        return Ok(Value::Null);
    }
    num(cstruct).ok_or_else(|| not_a_number(node, cstruct))
}

/// A signed integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl Integer {
    fn num(value: &Value) -> Option<Value> {
        let i = match value {
            Value::Int(i) => *i,
            Value::Bool(b) => i64::from(*b),
            Value::Float(f) => rust_decimal::Decimal::from_f64(f.trunc())?.to_i64()?,
            Value::Decimal(d) => d.trunc().to_i64()?,
            Value::Str(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Value::Int(i))
    }
}

impl SchemaType for Integer {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        serialize_number(node, appstruct, Self::num)
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        deserialize_number(node, cstruct, Self::num)
    }
}

/// A floating point number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl Float {
    fn num(value: &Value) -> Option<Value> {
        let f = match value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Decimal(d) => d.to_f64()?,
            Value::Str(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Value::Float(f))
    }
}

impl SchemaType for Float {
    fn name(&self) -> &'static str {
        "float"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        serialize_number(node, appstruct, Self::num)
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        deserialize_number(node, cstruct, Self::num)
    }
}

/// An exact decimal number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal;

impl Decimal {
    fn num(value: &Value) -> Option<Value> {
        let d = match value {
            Value::Decimal(d) => *d,
            Value::Int(i) => rust_decimal::Decimal::from(*i),
            Value::Bool(b) => rust_decimal::Decimal::from(u8::from(*b)),
            Value::Float(f) => rust_decimal::Decimal::from_f64(*f)?,
            Value::Str(s) => {
                let s = s.trim();
                rust_decimal::Decimal::from_str(s)
                    .or_else(|_| rust_decimal::Decimal::from_scientific(s))
                    .ok()?
            }
            _ => return None,
        };
        Some(Value::Decimal(d))
    }
}

impl SchemaType for Decimal {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        serialize_number(node, appstruct, Self::num)
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        deserialize_number(node, cstruct, Self::num)
    }
}

/// A boolean.
///
/// Deserialization is lenient: `"false"` and `"0"` (any case) are false,
/// every other value is true.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl SchemaType for Boolean {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn serialize(&self, _node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_null() {
            return Ok(Value::Null);
        }
        let text = if appstruct.is_truthy() { "true" } else { "false" };
        Ok(Value::str(text))
    }

    fn deserialize(
        &self,
        _node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        match cstruct {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            other => {
                let text = other.to_string().to_lowercase();
                Ok(Value::Bool(!matches!(text.as_str(), "false" | "0")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_parse_from_names() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin_1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[test]
    fn latin1_round_trip() {
        let bytes = Encoding::Latin1.encode("caf\u{e9}").unwrap();
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(Encoding::Latin1.decode(&bytes).unwrap(), "caf\u{e9}");
        assert!(Encoding::Ascii.encode("caf\u{e9}").is_err());
    }

    #[test]
    fn integer_conversions() {
        assert_eq!(Integer::num(&Value::str(" 34 ")), Some(Value::Int(34)));
        assert_eq!(Integer::num(&Value::Float(3.9)), Some(Value::Int(3)));
        assert_eq!(Integer::num(&Value::str("3.5")), None);
        assert_eq!(Integer::num(&Value::Float(-2.7)), Some(Value::Int(-2)));
    }

    #[test]
    fn integer_rejects_out_of_range_floats() {
        assert_eq!(Integer::num(&Value::Float(1e300)), None);
        assert_eq!(Integer::num(&Value::Float(-1e300)), None);
        assert_eq!(Integer::num(&Value::Float(f64::NAN)), None);
        assert_eq!(Integer::num(&Value::Float(f64::INFINITY)), None);
    }
}
