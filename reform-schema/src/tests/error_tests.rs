//! Tests for the Invalid error tree
//!
//! - Property 6: Error tree flattening
//! - Keys of positional parents, message joining, FieldError mapping

use proptest::prelude::*;

use crate::error::{Invalid, SchemaError};
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::{Integer, Mapping, Str, Tuple};
use crate::validators::Function;
use crate::value::Value;

fn failing(name: &str, msg: &'static str) -> SchemaNode {
    SchemaNode::new(Str::new())
        .with_name(name)
        .with_validator(Function::new(move |_| msg))
}

// =============================================================================
// Property 6: Error tree flattening
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 6: Error tree flattening**
    /// *For any* set of always-failing children, `asdict()` has exactly one
    /// key per child, mapped to that child's message.
    #[test]
    fn prop_asdict_has_one_key_per_failing_child(
        names in prop::collection::btree_set("[a-z]{1,8}", 1..6)
    ) {
        let mut schema = SchemaNode::new(Mapping::new());
        for name in &names {
            schema.add(failing(name, "broken"));
        }
        let input = Value::map(names.iter().map(|n| (n.clone(), "x")));
        let err = schema.deserialize(&input).unwrap_err();
        let dict = err.asdict();

        prop_assert_eq!(dict.len(), names.len());
        for name in &names {
            prop_assert_eq!(dict.get(name).map(String::as_str), Some("broken"));
        }
    }

    /// Nested failures are keyed by their dotted path.
    #[test]
    fn prop_nested_keys_are_dotted(outer in "[a-z]{1,8}", inner in "[a-z]{1,8}") {
        let schema = SchemaNode::new(Mapping::new()).with_child(
            SchemaNode::new(Mapping::new())
                .with_name(outer.as_str())
                .with_child(failing(&inner, "bad")),
        );
        let input = Value::map([(outer.clone(), Value::map([(inner.clone(), "x")]))]);
        let err = schema.deserialize(&input).unwrap_err();
        let key = format!("{}.{}", outer, inner);
        let dict = err.asdict();
        prop_assert_eq!(dict.get(&key).map(String::as_str), Some("bad"));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_x_and_y_both_reported() {
        let schema = SchemaNode::new(Mapping::new())
            .with_child(failing("x", "x failed"))
            .with_child(failing("y", "y failed"));
        let err = schema
            .deserialize(&Value::map([("x", "1"), ("y", "2")]))
            .unwrap_err();
        let dict = err.asdict();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict["x"], "x failed");
        assert_eq!(dict["y"], "y failed");
        assert_eq!(err.children[0].pos, Some(0));
        assert_eq!(err.children[1].pos, Some(1));
    }

    #[test]
    fn test_positional_children_keyed_by_index() {
        let schema = SchemaNode::new(Mapping::new()).with_child(
            SchemaNode::new(Tuple)
                .with_name("point")
                .with_child(SchemaNode::new(Integer).with_name("x"))
                .with_child(SchemaNode::new(Integer).with_name("y")),
        );
        let input = Value::map([("point", Value::tuple(["1", "nope"]))]);
        let err = schema.deserialize(&input).unwrap_err();
        assert_eq!(
            err.asdict().into_iter().collect::<Vec<_>>(),
            vec![("point.1".to_string(), "\"nope\" is not a number".to_string())]
        );
    }

    #[test]
    fn test_messages_along_a_path_are_joined() {
        let node = SchemaNode::new(Mapping::new())
            .with_name("")
            .with_child(SchemaNode::new(Str::new()).with_name("a"));
        let mut parent = Invalid::new(&node, "Form is incomplete");
        parent.set_child("a", "Missing").unwrap();
        assert_eq!(parent.asdict()["a"], "Form is incomplete; Missing");
    }

    #[test]
    fn test_set_child_unknown_name() {
        let node = SchemaNode::new(Mapping::new());
        let mut err = Invalid::bare(&node);
        let result = err.set_child("nope", "Missing");
        assert!(matches!(result, Err(SchemaError::KeyNotFound(name)) if name == "nope"));
    }

    #[test]
    fn test_asdict_with_translator() {
        let schema = SchemaNode::new(Mapping::new())
            .with_child(SchemaNode::new(Integer).with_name("age"));
        let err = schema.deserialize(&Value::map([("other", "1")])).unwrap_err();
        let dict = err.asdict_with(|msg| match msg.code.as_str() {
            "required" => "Erforderlich".to_string(),
            _ => msg.interpolate(),
        });
        assert_eq!(dict["age"], "Erforderlich");
    }

    #[test]
    fn test_field_errors_carry_codes() {
        let schema = SchemaNode::new(Mapping::new())
            .with_child(SchemaNode::new(Integer).with_name("age"))
            .with_child(SchemaNode::new(Str::new()).with_name("name"));
        let err = schema
            .deserialize(&Value::map([("age", "abc")]))
            .unwrap_err();
        let fields = err.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "age");
        assert_eq!(fields[0].code, "type");
        assert_eq!(fields[1].field, "name");
        assert_eq!(fields[1].code, "required");

        let json = serde_json::to_value(&fields[1]).unwrap();
        assert_eq!(json["message"], "Required");
    }

    #[test]
    fn test_paths_are_lazy_and_depth_first() {
        let node = SchemaNode::new(Mapping::new())
            .with_child(SchemaNode::new(Str::new()).with_name("a"))
            .with_child(SchemaNode::new(Str::new()).with_name("b"));
        let mut err = Invalid::bare(&node);
        err.set_child("a", "first").unwrap();
        err.set_child("b", "second").unwrap();

        let mut paths = err.paths();
        let first = paths.next().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].keyname(), "a");
        assert_eq!(paths.next().unwrap()[1].keyname(), "b");
        assert!(paths.next().is_none());
    }

    #[test]
    fn test_display_renders_asdict() {
        let node = SchemaNode::new(Mapping::new())
            .with_child(SchemaNode::new(Str::new()).with_name("a"));
        let mut err = Invalid::bare(&node);
        err.set_child("a", Message::new("Too ${what}").with("what", "short"))
            .unwrap();
        assert_eq!(err.to_string(), "{'a': 'Too short'}");
    }

    #[test]
    fn test_detached_error_has_empty_key() {
        let err = Invalid::detached("Something broke");
        assert!(err.node.is_none());
        assert_eq!(err.asdict()[""], "Something broke");
    }
}
