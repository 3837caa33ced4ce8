//! Configuration for building schemas from field configurations.
//!
//! This module provides the [`FactoryConfig`] struct used by
//! [`SchemaFactory`](crate::factory::SchemaFactory).
//!
//! # Example
//! ```rust,ignore
//! use reform_schema::{FactoryConfig, Unknown};
//!
//! let config = FactoryConfig::new()
//!     .with_string_size(120)
//!     .with_unknown(Unknown::Raise);
//! config.validate()?;
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Unknown;

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// string_size must be greater than 0
    InvalidStringSize,
    /// text_size must be greater than 0
    InvalidTextSize,
    /// password_min must not exceed password_max
    InvalidPasswordLength { min: usize, max: usize },
    /// input_size must be greater than 0
    InvalidInputSize,
    /// selection_size must be greater than 0
    InvalidSelectionSize,
    /// confirm_suffix must not be empty
    EmptyConfirmSuffix,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStringSize => write!(f, "string_size must be greater than 0"),
            Self::InvalidTextSize => write!(f, "text_size must be greater than 0"),
            Self::InvalidPasswordLength { min, max } => {
                write!(
                    f,
                    "password_min ({}) must not exceed password_max ({})",
                    min, max
                )
            }
            Self::InvalidInputSize => write!(f, "input_size must be greater than 0"),
            Self::InvalidSelectionSize => write!(f, "selection_size must be greater than 0"),
            Self::EmptyConfirmSuffix => write!(f, "confirm_suffix must not be empty"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Defaults applied when a field configuration leaves a setting out.
///
/// # Fields
///
/// * `string_size` - Maximum length of single line strings. Default: 255.
/// * `text_size` - Maximum length of text blocks. Default: 1,000,000.
/// * `password_min` / `password_max` - Password length bounds. Default: 5 and 20.
/// * `input_size` - Width hint for text inputs. Default: 50.
/// * `selection_size` - Height hint for multi selections. Default: 4.
/// * `unknown` - Unknown-key policy of the generated root mapping. Default: `Ignore`.
/// * `confirm_suffix` - Suffix of the companion key of confirmed fields. Default: `-confirm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Maximum length of single line strings (default: 255)
    pub string_size: usize,
    /// Maximum length of text blocks (default: 1,000,000)
    pub text_size: usize,
    /// Minimum password length (default: 5)
    pub password_min: usize,
    /// Maximum password length (default: 20)
    pub password_max: usize,
    /// Width hint for text inputs (default: 50)
    pub input_size: usize,
    /// Height hint for multi selections (default: 4)
    pub selection_size: usize,
    /// Unknown-key policy of the root mapping (default: Ignore)
    pub unknown: Unknown,
    /// Companion key suffix for confirmed fields (default: "-confirm")
    pub confirm_suffix: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            string_size: 255,
            text_size: 1_000_000,
            password_min: 5,
            password_max: 20,
            input_size: 50,
            selection_size: 4,
            unknown: Unknown::default(),
            confirm_suffix: "-confirm".to_string(),
        }
    }
}

impl FactoryConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.string_size == 0 {
            return Err(ConfigValidationError::InvalidStringSize);
        }
        if self.text_size == 0 {
            return Err(ConfigValidationError::InvalidTextSize);
        }
        if self.password_min > self.password_max {
            return Err(ConfigValidationError::InvalidPasswordLength {
                min: self.password_min,
                max: self.password_max,
            });
        }
        if self.input_size == 0 {
            return Err(ConfigValidationError::InvalidInputSize);
        }
        if self.selection_size == 0 {
            return Err(ConfigValidationError::InvalidSelectionSize);
        }
        if self.confirm_suffix.is_empty() {
            return Err(ConfigValidationError::EmptyConfirmSuffix);
        }
        Ok(())
    }

    /// Set the maximum length of single line strings.
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_string_size(mut self, size: usize) -> Self {
        self.string_size = size;
        self
    }

    /// Set the maximum length of text blocks.
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_text_size(mut self, size: usize) -> Self {
        self.text_size = size;
        self
    }

    /// Set the password length bounds.
    ///
    /// # Example
    /// ```rust,ignore
    /// let config = FactoryConfig::new().with_password_length(8, 64);
    /// ```
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_password_length(mut self, min: usize, max: usize) -> Self {
        self.password_min = min;
        self.password_max = max;
        self
    }

    /// Set the width hint for text inputs.
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_input_size(mut self, size: usize) -> Self {
        self.input_size = size;
        self
    }

    /// Set the height hint for multi selections.
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_selection_size(mut self, size: usize) -> Self {
        self.selection_size = size;
        self
    }

    /// Set the unknown-key policy of the root mapping.
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_unknown(mut self, unknown: Unknown) -> Self {
        self.unknown = unknown;
        self
    }

    /// Set the companion key suffix of confirmed fields.
    #[must_use = "This method returns a new FactoryConfig and does not modify self"]
    pub fn with_confirm_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.confirm_suffix = suffix.into();
        self
    }
}
