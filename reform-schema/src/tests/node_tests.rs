//! Tests for schema nodes
//!
//! - Property 3: Required enforcement
//! - Property 7: Deferred binding
//! - Child access, builder ordering, flatten and dotted paths

use proptest::prelude::*;

use crate::builder::SchemaBuilder;
use crate::error::SchemaError;
use crate::node::{Attr, Bindings, Missing, SchemaNode};
use crate::types::{Integer, Mapping, Str, Tuple, Unknown};
use crate::validators::{Length, OneOf, Range};
use crate::value::Value;

fn person() -> SchemaNode {
    SchemaBuilder::new()
        .field("name", SchemaNode::new(Str::new()))
        .field(
            "addr",
            SchemaNode::new(Mapping::new()).with_child(SchemaNode::new(Str::new()).with_name("city")),
        )
        .field(
            "point",
            SchemaNode::new(Tuple)
                .with_child(SchemaNode::new(Integer).with_name("x"))
                .with_child(SchemaNode::new(Integer).with_name("y")),
        )
        .build()
}

fn person_appstruct() -> Value {
    Value::map([
        ("name", Value::str("Ann")),
        ("addr", Value::map([("city", "Oslo")])),
        ("point", Value::tuple([1, 2])),
    ])
}

// =============================================================================
// Property 3: Required enforcement
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 3: Required enforcement**
    /// A node without `missing` fails as Required on absent input; with
    /// `missing = X` it returns X without validation.
    #[test]
    fn prop_missing_value_returned_unvalidated(x in any::<i64>()) {
        let required = SchemaNode::new(Integer).with_name("n");
        let err = required.deserialize(&Value::Null).unwrap_err();
        prop_assert_eq!(err.messages()[0].code.as_str(), "required");

        // the range would reject x, but missing values skip validation
        let optional = SchemaNode::new(Integer)
            .with_name("n")
            .with_missing(x)
            .with_validator(Range::new(Some(Value::Int(i64::MAX)), None).with_min_err("never"));
        prop_assert_eq!(optional.deserialize(&Value::Null).unwrap(), Value::Int(x));
    }

    /// **Property 7: Deferred binding**
    /// `bind` resolves a deferred `missing` on a clone and leaves the original deferred.
    #[test]
    fn prop_bind_resolves_deferred_missing(fallback in any::<i64>()) {
        let node = SchemaNode::new(Integer)
            .with_name("n")
            .defer_missing(|_, kw| kw.get("fallback").cloned().unwrap_or_default());
        let bound = node.bind(&Bindings::new().with("fallback", fallback)).unwrap();

        prop_assert_eq!(&bound.missing, &Attr::Fixed(Missing::Value(Value::Int(fallback))));
        prop_assert!(node.missing.is_deferred());
        prop_assert_eq!(bound.deserialize(&Value::Null).unwrap(), Value::Int(fallback));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    // --- Deserialize pipeline ---

    #[test]
    fn test_preparer_runs_before_validation() {
        let node = SchemaNode::new(Str::new())
            .with_name("code")
            .with_preparer(|v| match v {
                Value::Str(s) => Value::Str(s.trim().to_uppercase()),
                other => other,
            })
            .with_validator(OneOf::new(["AB", "CD"]));
        assert_eq!(node.deserialize(&Value::str("  ab ")).unwrap(), Value::str("AB"));
        assert!(node.deserialize(&Value::str("xy")).is_err());
    }

    #[test]
    fn test_preparer_may_produce_null() {
        let node = SchemaNode::new(Str::new())
            .with_preparer(|v| if v.is_absent() { Value::Null } else { v });
        let err = node.deserialize(&Value::str("")).unwrap_err();
        assert_eq!(err.messages()[0].code, "required");
    }

    #[test]
    fn test_serialize_substitutes_default() {
        let node = SchemaNode::new(Integer).with_default(5);
        assert_eq!(node.serialize(&Value::Null).unwrap(), Value::str("5"));
        assert_eq!(node.serialize(&Value::Int(7)).unwrap(), Value::str("7"));

        let deferred = SchemaNode::new(Integer).defer_default(|_, _| 5);
        assert_eq!(deferred.serialize(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_title_derived_from_name() {
        let node = SchemaNode::new(Str::new()).with_name("first_name");
        assert_eq!(node.title(), "First Name");
        let node = node.with_title("Given name");
        assert_eq!(node.title(), "Given name");
    }

    #[test]
    fn test_required_flag() {
        assert!(SchemaNode::new(Str::new()).is_required());
        assert!(!SchemaNode::new(Str::new()).with_missing(Value::Null).is_required());
        assert!(SchemaNode::new(Str::new()).defer_missing(|_, _| Value::None).is_required());
    }

    // --- Binding ---

    #[test]
    fn test_bind_resolves_every_attribute() {
        let node = SchemaNode::new(Str::new())
            .with_name("color")
            .defer_title(|node, _| format!("Pick a {}", node.name))
            .defer_description(|_, kw| format!("{} choices", kw.len()))
            .defer_default(|_, kw| kw.get("default").cloned().unwrap_or_default())
            .defer_validator(|_, kw| {
                let choices = kw.get("colors").and_then(Value::as_slice).unwrap_or(&[]).to_vec();
                OneOf::new(choices)
            })
            .defer_widget(|_, _| serde_json::json!({"type": "select"}))
            .defer_extra("placeholder", |_, _| "choose");

        let kw = Bindings::new()
            .with("colors", Value::list(["red", "blue"]))
            .with("default", "red");
        let bound = node.bind(&kw).unwrap();

        assert_eq!(bound.title(), "Pick a color");
        assert_eq!(bound.description, Attr::Fixed("2 choices".to_string()));
        assert_eq!(bound.default, Attr::Fixed(Value::str("red")));
        assert_eq!(bound.widget, Some(Attr::Fixed(serde_json::json!({"type": "select"}))));
        assert_eq!(bound.extra_value("placeholder"), Some(&Value::str("choose")));
        assert!(bound.deserialize(&Value::str("blue")).is_ok());
        assert!(bound.deserialize(&Value::str("green")).is_err());

        // unbound deferred validators are not run
        assert!(node.deserialize(&Value::str("green")).is_ok());
        assert!(node.description.is_deferred());
    }

    #[test]
    fn test_bind_children_before_after_bind() {
        let schema = SchemaNode::new(Mapping::new())
            .with_child(
                SchemaNode::new(Str::new())
                    .with_name("name")
                    .defer_description(|_, kw| {
                        kw.get("hint").map(Value::to_string).unwrap_or_default()
                    }),
            )
            .with_child(SchemaNode::new(Integer).with_name("age"))
            .with_after_bind(|node, kw| {
                if kw.contains("hide_age") {
                    node.remove("age")?;
                }
                let hint = node.child("name")?.description.fixed().cloned().unwrap_or_default();
                node.extra.insert("hint".to_string(), Attr::Fixed(Value::str(hint)));
                Ok(())
            });

        let kw = Bindings::new().with("hide_age", true).with("hint", "Your name");
        let bound = schema.bind(&kw).unwrap();
        assert!(!bound.contains("age"));
        assert_eq!(bound.extra_value("hint"), Some(&Value::str("Your name")));
        assert!(schema.contains("age"));
    }

    #[test]
    fn test_after_bind_errors_propagate() {
        let schema = SchemaNode::new(Mapping::new()).with_after_bind(|node, _| {
            node.remove("nope")?;
            Ok(())
        });
        let result = schema.bind(&Bindings::new());
        assert!(matches!(result, Err(SchemaError::KeyNotFound(_))));
    }

    #[test]
    fn test_clone_keeps_order_and_is_independent() {
        let node = person();
        let mut cloned = node.clone();
        cloned.child_mut("name").unwrap().name = "full_name".to_string();
        assert!(node.contains("name"));
        assert!(cloned.contains("full_name"));
        assert_eq!(node.order(), cloned.order());
    }

    // --- Child access ---

    #[test]
    fn test_child_access() {
        let mut node = person();
        let names: Vec<&str> = node.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "addr", "point"]);
        assert!(matches!(node.child("nope"), Err(SchemaError::KeyNotFound(_))));

        let old = node
            .replace("name", SchemaNode::new(Str::new()).with_validator(Length::at_most(3)))
            .unwrap();
        assert_eq!(old.name, "name");
        assert_eq!(node.child("name").unwrap().name, "name");
        assert!(node.child("name").unwrap().validator.is_some());

        let removed = node.remove("addr").unwrap();
        assert_eq!(removed.name, "addr");
        assert_eq!((&node).into_iter().count(), 2);
        assert!(node.remove("addr").is_err());
    }

    // --- Builder ---

    #[test]
    fn test_builder_orders_by_declaration() {
        let a = SchemaNode::new(Str::new());
        let b = SchemaNode::new(Integer);
        let schema = SchemaBuilder::new().field("b", b).field("a", a).build();
        let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(schema.name, "");
    }

    #[test]
    fn test_builder_inherit_and_override() {
        let base = SchemaBuilder::new()
            .field("name", SchemaNode::new(Str::new()))
            .field("age", SchemaNode::new(Integer))
            .build();
        let derived = SchemaBuilder::new()
            .inherit(&base)
            .field("age", SchemaNode::new(Str::new()))
            .field("email", SchemaNode::new(Str::new()))
            .unknown(Unknown::Raise)
            .build();

        let names: Vec<&str> = derived.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "email"]);
        assert_eq!(derived.child("age").unwrap().typ().name(), "string");
        assert_eq!(base.child("age").unwrap().typ().name(), "integer");
    }

    // --- Flatten and paths ---

    #[test]
    fn test_flatten_and_unflatten() {
        let schema = person();
        let flat = schema.flatten(&person_appstruct()).unwrap();
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["addr.city", "name", "point.x", "point.y"]);
        assert_eq!(flat["point.y"], Value::Int(2));

        assert_eq!(schema.unflatten(&flat).unwrap(), person_appstruct());
    }

    #[test]
    fn test_unflatten_rejects_unknown_paths() {
        let schema = person();
        let mut flat = schema.flatten(&person_appstruct()).unwrap();
        flat.insert("zzz".to_string(), Value::Int(1));
        assert!(matches!(schema.unflatten(&flat), Err(SchemaError::KeyNotFound(_))));
    }

    #[test]
    fn test_get_and_set_value() {
        let schema = person();
        let appstruct = person_appstruct();
        assert_eq!(schema.get_value(&appstruct, "addr.city").unwrap(), Value::str("Oslo"));
        assert_eq!(schema.get_value(&appstruct, "point.y").unwrap(), Value::Int(2));

        let updated = schema.set_value(appstruct.clone(), "point.x", 5).unwrap();
        assert_eq!(schema.get_value(&updated, "point").unwrap(), Value::tuple([5, 2]));
        let updated = schema.set_value(updated, "addr.city", "Bergen").unwrap();
        assert_eq!(schema.get_value(&updated, "addr.city").unwrap(), Value::str("Bergen"));

        assert!(matches!(
            schema.get_value(&appstruct, "nope"),
            Err(SchemaError::KeyNotFound(_))
        ));
        assert!(matches!(
            schema.get_value(&appstruct, "name.first"),
            Err(SchemaError::LeafNode(_))
        ));
    }
}
