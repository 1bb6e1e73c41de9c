//! Answer validation errors
//!
//! Error codes:
//! - MISSING_REQUIRED_FIELD
//! - UNKNOWN_FIELD
//! - TYPE_MISMATCH
//! - INVALID_OPTION
//! - OUT_OF_RANGE
//! - UNSUPPORTED_FIELD_TYPE

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    /// A required field has no answer
    MissingRequiredField,
    /// An answer references a field the form does not have
    UnknownField,
    /// The value has the wrong shape for the field type
    TypeMismatch,
    /// The value is not one of the field's options
    InvalidOption,
    /// A rating falls outside its bounds
    OutOfRange,
    /// The field declares a type this service cannot validate
    UnsupportedFieldType,
}

impl ValidationErrorKind {
    /// Returns the machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationErrorKind::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ValidationErrorKind::UnknownField => "UNKNOWN_FIELD",
            ValidationErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ValidationErrorKind::InvalidOption => "INVALID_OPTION",
            ValidationErrorKind::OutOfRange => "OUT_OF_RANGE",
            ValidationErrorKind::UnsupportedFieldType => "UNSUPPORTED_FIELD_TYPE",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// First validation failure found in a submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    kind: ValidationErrorKind,
    field_id: String,
    message: String,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, field_id: &str, message: String) -> Self {
        Self {
            kind,
            field_id: field_id.to_string(),
            message,
        }
    }

    pub fn missing_required(field_id: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingRequiredField,
            field_id,
            format!("missing required field: {}", field_id),
        )
    }

    pub fn unknown_field(field_id: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownField,
            field_id,
            format!("unknown field: {}", field_id),
        )
    }

    pub fn type_mismatch(field_id: &str, expected: &str, actual: &str) -> Self {
        Self::new(
            ValidationErrorKind::TypeMismatch,
            field_id,
            format!("field {} expects {}, got {}", field_id, expected, actual),
        )
    }

    pub fn invalid_option(field_id: &str, value: &str) -> Self {
        Self::new(
            ValidationErrorKind::InvalidOption,
            field_id,
            format!("field {} invalid option: {}", field_id, value),
        )
    }

    pub fn out_of_range(field_id: &str, value: i64, min: i64, max: i64) -> Self {
        Self::new(
            ValidationErrorKind::OutOfRange,
            field_id,
            format!("field {} out of range: {} not in [{}, {}]", field_id, value, min, max),
        )
    }

    pub fn unsupported_type(field_id: &str, field_type: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnsupportedFieldType,
            field_id,
            format!("unsupported field type {} on field {}", field_type, field_id),
        )
    }

    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            ValidationErrorKind::MissingRequiredField.code(),
            "MISSING_REQUIRED_FIELD"
        );
        assert_eq!(ValidationErrorKind::OutOfRange.to_string(), "OUT_OF_RANGE");
        assert_eq!(
            serde_json::to_value(ValidationErrorKind::InvalidOption).unwrap(),
            "INVALID_OPTION"
        );
    }

    #[test]
    fn test_message_names_field() {
        let err = ValidationError::missing_required("email");
        assert_eq!(err.to_string(), "missing required field: email");
        assert_eq!(err.field_id(), "email");
        assert_eq!(err.kind(), ValidationErrorKind::MissingRequiredField);
    }
}
