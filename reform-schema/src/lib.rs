//! # Reform Schema
//!
//! Schema-based validation and serialization of structured data.
//!
//! ## Overview
//!
//! A schema is a tree of [`SchemaNode`]s. Each node carries a type coercer
//! ([`SchemaType`]) and field metadata, and converts between two shapes:
//!
//! - **cstruct**: the wire form, typically strings from a submitted form
//! - **appstruct**: the typed application form
//!
//! `deserialize` turns a cstruct into an appstruct and validates it;
//! `serialize` turns an appstruct back into a cstruct. Failures come back
//! as one [`Invalid`] tree holding every problem of the submission.
//!
//! ## Architecture
//!
//! ```text
//!  cstruct ──► SchemaNode::deserialize ──► SchemaType::deserialize
//!                     │                          │ (children, formstruct)
//!                     ▼                          ▼
//!              preparer ─► missing/required ─► Validator ──► appstruct
//!                                                  │
//!                                                  ▼
//!                                           Invalid (tree)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reform_schema::prelude::*;
//!
//! let person = SchemaBuilder::new()
//!     .field("name", SchemaNode::new(Str::new()).with_validator(Length::at_most(40)))
//!     .field("age", SchemaNode::new(Integer).with_validator(Range::between(0, 150)))
//!     .build();
//!
//! let cstruct = Value::map([("name", "Ann"), ("age", "34")]);
//! let appstruct = person.deserialize(&cstruct)?;
//! assert_eq!(appstruct.as_map().unwrap()["age"], Value::Int(34));
//! ```
//!
//! ## Deferred Attributes
//!
//! Attributes that depend on runtime context are deferred and resolved by
//! [`SchemaNode::bind`], which works on a clone:
//!
//! ```rust,ignore
//! let schema = SchemaNode::new(Str::new())
//!     .with_name("color")
//!     .defer_validator(|_, kw| OneOf::new(kw.get("colors").and_then(Value::as_slice).unwrap_or(&[]).to_vec()));
//!
//! let bound = schema.bind(&Bindings::new().with("colors", Value::list(["red", "blue"])))?;
//! ```
//!
//! ## Schemas From Configuration
//!
//! [`SchemaFactory`] builds schemas from [`FieldConf`] lists, with defaults
//! taken from a [`FactoryConfig`].

pub mod builder;
pub mod config;
pub mod error;
pub mod factory;
pub mod message;
pub mod node;
pub mod types;
pub mod validators;
pub mod value;

#[cfg(test)]
mod tests;

// Public API
pub use builder::SchemaBuilder;
pub use config::{ConfigValidationError, FactoryConfig};
pub use error::{ErrorMsg, FieldError, Invalid, NodeRef, SchemaError, SchemaResult};
pub use factory::{FieldConf, SchemaFactory};
pub use message::Message;
pub use node::{Attr, Bindings, Deferred, Missing, SchemaNode};
pub use types::{
    Boolean, Confirmed, Date, DateTime, Decimal, Encoding, FileData, FlatMap, Float, GlobalObject,
    GlobalRef, Integer, List, Mapping, ObjectRegistry, SchemaType, Set, Str, Time, Tuple, Unknown,
};
pub use validators::{All, Email, Function, Length, OneOf, Range, Regex, Validate, Validator, Verdict};
pub use value::{Value, ValueMap, ValueSet};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use reform_schema::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Validators
        All,
        // Nodes
        Attr,
        Bindings,
        // Types
        Boolean,
        Confirmed,
        Date,
        DateTime,
        Decimal,
        Deferred,
        Email,
        // Configuration
        FactoryConfig,
        FieldConf,
        FileData,
        Float,
        Function,
        GlobalObject,
        GlobalRef,
        Integer,
        // Errors
        Invalid,
        Length,
        List,
        Mapping,
        Message,
        Missing,
        ObjectRegistry,
        OneOf,
        Range,
        Regex,
        SchemaBuilder,
        SchemaError,
        SchemaFactory,
        SchemaNode,
        SchemaResult,
        SchemaType,
        Set,
        Str,
        Time,
        Tuple,
        Unknown,
        Validate,
        Validator,
        // Values
        Value,
        ValueMap,
    };
}
