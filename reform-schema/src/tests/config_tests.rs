//! Configuration tests - Property-based tests for FactoryConfig
//!
//! Tests that configuration defaults are sensible and validation works correctly.

use proptest::prelude::*;

use crate::config::{ConfigValidationError, FactoryConfig};
use crate::error::SchemaError;
use crate::factory::SchemaFactory;
use crate::types::Unknown;

// =============================================================================
// Property-Based Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Default configuration is valid
    #[test]
    fn prop_configuration_defaults_are_valid(_dummy in 0..1i32) {
        let config = FactoryConfig::default();

        prop_assert!(config.validate().is_ok(), "Default config should be valid");
        prop_assert_eq!(config.string_size, 255);
        prop_assert_eq!(config.text_size, 1_000_000);
        prop_assert_eq!((config.password_min, config.password_max), (5, 20));
        prop_assert_eq!(config.input_size, 50);
        prop_assert_eq!(config.selection_size, 4);
        prop_assert_eq!(config.unknown, Unknown::Ignore);
        prop_assert_eq!(config.confirm_suffix.as_str(), "-confirm");
    }

    /// Property: Invalid configurations are rejected
    /// Zero sizes fail validation
    #[test]
    fn prop_invalid_sizes_rejected(
        string_size in 0usize..2,
        text_size in 0usize..2,
        input_size in 0usize..2,
        selection_size in 0usize..2,
    ) {
        let config = FactoryConfig {
            string_size,
            text_size,
            input_size,
            selection_size,
            ..FactoryConfig::default()
        };

        let result = config.validate();

        if string_size == 0 || text_size == 0 || input_size == 0 || selection_size == 0 {
            prop_assert!(result.is_err(), "Config with zero sizes should be invalid");
        } else {
            prop_assert!(result.is_ok(), "Config with non-zero sizes should be valid");
        }
    }

    /// Property: Password bounds must be ordered
    #[test]
    fn prop_password_bounds_ordered(min in 0usize..50, max in 0usize..50) {
        let result = FactoryConfig::new().with_password_length(min, max).validate();
        if min > max {
            prop_assert_eq!(result, Err(ConfigValidationError::InvalidPasswordLength { min, max }));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Property: Builder pattern preserves validity
    #[test]
    fn prop_builder_pattern_preserves_validity(
        string_size in 1usize..10_000,
        text_size in 1usize..10_000_000,
        input_size in 1usize..200,
        selection_size in 1usize..50,
    ) {
        let config = FactoryConfig::new()
            .with_string_size(string_size)
            .with_text_size(text_size)
            .with_input_size(input_size)
            .with_selection_size(selection_size)
            .with_unknown(Unknown::Raise);

        prop_assert!(config.validate().is_ok());
        prop_assert_eq!(config.string_size, string_size);
        prop_assert_eq!(config.text_size, text_size);
        prop_assert_eq!(config.input_size, input_size);
        prop_assert_eq!(config.selection_size, selection_size);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_empty_confirm_suffix_rejected() {
        let config = FactoryConfig::new().with_confirm_suffix("");
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyConfirmSuffix));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigValidationError::InvalidPasswordLength { min: 9, max: 3 };
        assert_eq!(err.to_string(), "password_min (9) must not exceed password_max (3)");
        assert_eq!(
            ConfigValidationError::InvalidStringSize.to_string(),
            "string_size must be greater than 0"
        );
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let result = SchemaFactory::new(FactoryConfig::new().with_string_size(0));
        assert!(matches!(
            result,
            Err(SchemaError::Config(ConfigValidationError::InvalidStringSize))
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: FactoryConfig =
            serde_json::from_str(r#"{"string_size": 80, "unknown": "preserve"}"#).unwrap();
        assert_eq!(config.string_size, 80);
        assert_eq!(config.unknown, Unknown::Preserve);
        assert_eq!(config.text_size, 1_000_000);
    }
}
