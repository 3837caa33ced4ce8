//! Property-based tests for validators
//!
//! Length, Range, Regex, Email, OneOf, All and Function.

use proptest::prelude::*;

use crate::error::{Invalid, SchemaError};
use crate::node::SchemaNode;
use crate::types::Str;
use crate::validators::{All, Email, Function, Length, OneOf, Range, Regex, Validate, Validator};
use crate::value::Value;

fn node() -> SchemaNode {
    SchemaNode::new(Str::new()).with_name("field")
}

fn first_message(err: &Invalid) -> String {
    err.messages()[0].interpolate()
}

// =============================================================================
// Length and Range bounds
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Length accepts exactly the strings whose character count lies within the bounds.
    #[test]
    fn prop_length_bounds(s in "\\PC{0,30}", min in 0usize..15, extra in 0usize..15) {
        let max = min + extra;
        let result = Length::between(min, max).validate(&node(), &Value::str(s.clone()));
        let len = s.chars().count();
        prop_assert_eq!(result.is_ok(), (min..=max).contains(&len));
    }

    /// Range accepts exactly the integers within the bounds.
    #[test]
    fn prop_range_bounds(v in -1000i64..1000, lo in -500i64..0, hi in 0i64..500) {
        let result = Range::between(lo, hi).validate(&node(), &Value::Int(v));
        prop_assert_eq!(result.is_ok(), (lo..=hi).contains(&v));
    }

    /// Integer and float bounds compare across numeric kinds.
    #[test]
    fn prop_range_mixed_numbers(v in -100.0f64..100.0) {
        let result = Range::between(0, 50).validate(&node(), &Value::Float(v));
        prop_assert_eq!(result.is_ok(), (0.0..=50.0).contains(&v));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_length_messages() {
        let err = Length::at_most(2).validate(&node(), &Value::str("abc")).unwrap_err();
        assert_eq!(first_message(&err), "Longer than maximum length 2");
        assert_eq!(err.messages()[0].code, "max_length");

        let err = Length::at_least(5).validate(&node(), &Value::list(["a"])).unwrap_err();
        assert_eq!(first_message(&err), "Shorter than minimum length 5");

        let err = Length::at_least(1).validate(&node(), &Value::Int(3)).unwrap_err();
        assert_eq!(first_message(&err), "\"3\" has no length");
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(Length::at_most(4).validate(&node(), &Value::str("caf\u{e9}")).is_ok());
    }

    #[test]
    fn test_range_messages() {
        let err = Range::between(1, 3).validate(&node(), &Value::Int(5)).unwrap_err();
        assert_eq!(first_message(&err), "5 is greater than maximum value 3");
        assert_eq!(err.messages()[0].code, "range");

        let err = Range::new(Some(Value::Int(10)), None)
            .with_min_err("${val} is too small (at least ${min})")
            .validate(&node(), &Value::Int(2))
            .unwrap_err();
        assert_eq!(first_message(&err), "2 is too small (at least 10)");
    }

    #[test]
    fn test_range_incomparable_values() {
        let err = Range::between(1, 3).validate(&node(), &Value::str("2")).unwrap_err();
        assert_eq!(err.messages()[0].code, "type");
    }

    #[test]
    fn test_regex_matches_at_start() {
        let regex = Regex::new("[a-z]+").unwrap();
        assert!(regex.validate(&node(), &Value::str("abc1")).is_ok());
        let err = regex.validate(&node(), &Value::str("1abc")).unwrap_err();
        assert_eq!(first_message(&err), "String does not match expected pattern");
        assert!(regex.validate(&node(), &Value::Int(1)).is_err());
        assert_eq!(regex.pattern(), "[a-z]+");
    }

    #[test]
    fn test_regex_invalid_pattern() {
        assert!(matches!(Regex::new("("), Err(SchemaError::Pattern(_))));
    }

    #[test]
    fn test_regex_custom_message() {
        let regex = Regex::new("^[0-9]").unwrap().with_message("Must start with a digit");
        let err = regex.validate(&node(), &Value::str("x")).unwrap_err();
        assert_eq!(first_message(&err), "Must start with a digit");
        assert_eq!(err.messages()[0].code, "pattern");
    }

    #[test]
    fn test_email() {
        let email = Email::new();
        assert!(email.validate(&node(), &Value::str("ann@example.com")).is_ok());
        assert!(email.validate(&node(), &Value::str("ANN.LEE+tag@mail.example.org")).is_ok());
        let err = email.validate(&node(), &Value::str("nope")).unwrap_err();
        assert_eq!(first_message(&err), "Invalid email address");
        assert_eq!(err.messages()[0].code, "email");
    }

    #[test]
    fn test_one_of() {
        let one_of = OneOf::new(["red", "blue"]);
        assert!(one_of.validate(&node(), &Value::str("red")).is_ok());
        let err = one_of.validate(&node(), &Value::str("green")).unwrap_err();
        assert_eq!(first_message(&err), "\"green\" is not one of red, blue");
    }

    #[test]
    fn test_all_collects_every_message() {
        let all = All::new()
            .with(Length::at_least(5))
            .with(Regex::new("[0-9]").unwrap());
        let err = all.validate(&node(), &Value::str("ab")).unwrap_err();
        let msgs: Vec<String> = err.messages().iter().map(|m| m.interpolate()).collect();
        assert_eq!(
            msgs,
            vec![
                "Shorter than minimum length 5".to_string(),
                "String does not match expected pattern".to_string(),
            ]
        );
        assert_eq!(err.asdict()["field"], "Shorter than minimum length 5; String does not match expected pattern");
        assert!(all.validate(&node(), &Value::str("12345")).is_ok());
    }

    #[test]
    fn test_all_from_iterator() {
        let all: All = vec![Validator::from(Length::at_most(1)), Validator::from(Email::new())]
            .into_iter()
            .collect();
        assert_eq!(all.validate(&node(), &Value::str("xy")).unwrap_err().messages().len(), 2);
    }

    #[test]
    fn test_function_verdicts() {
        let even = Function::new(|v: &Value| v.as_i64().is_some_and(|i| i % 2 == 0));
        assert!(even.validate(&node(), &Value::Int(4)).is_ok());
        let err = even.validate(&node(), &Value::Int(3)).unwrap_err();
        assert_eq!(first_message(&err), "Invalid value");
        assert_eq!(err.messages()[0].code, "custom");

        let named = Function::new(|v: &Value| {
            if v.is_truthy() { Value::Bool(true) } else { Value::str("value is empty") }
        });
        assert!(named.validate(&node(), &Value::str("x")).is_ok());
        assert_eq!(
            first_message(&named.validate(&node(), &Value::str("")).unwrap_err()),
            "value is empty"
        );

        // an empty message is a plain failure
        let blank = Function::new(|_: &Value| "").with_message("Not allowed");
        assert_eq!(first_message(&blank.validate(&node(), &Value::Int(1)).unwrap_err()), "Not allowed");
    }

    #[test]
    fn test_closure_validators() {
        let validator = Validator::from_fn(|node: &SchemaNode, value: &Value| {
            if value.as_str() == Some("admin") {
                Err(Invalid::new(node, "Reserved name"))
            } else {
                Ok(())
            }
        });
        assert!(validator.validate(&node(), &Value::str("ann")).is_ok());
        let err = validator.validate(&node(), &Value::str("admin")).unwrap_err();
        assert_eq!(err.asdict()["field"], "Reserved name");
    }
}
