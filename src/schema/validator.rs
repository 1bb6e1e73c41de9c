//! Answer validator
//!
//! Validation semantics:
//! - Every required field has at least one answer
//! - Every answer references a declared field
//! - Each value has the shape its field type expects
//! - mcq values are one of the options (no options means unconstrained)
//! - checkbox values are all members of the options (no options means
//!   nothing is accepted)
//! - rating values, truncated toward zero, fall within `[min, max]`
//!
//! The first failure wins; errors are not accumulated. Validation has no
//! side effects and does not look at `visibleIf` rules.

use std::collections::HashMap;

use serde_json::Value;

use super::answer::{Answer, AnswerValue};
use super::errors::{ValidationError, ValidationResult};
use super::types::{Field, FieldType};

/// Validates submitted answers against a form's fields.
pub struct AnswerValidator<'a> {
    fields: &'a [Field],
    by_id: HashMap<&'a str, &'a Field>,
}

impl<'a> AnswerValidator<'a> {
    /// Creates a validator over the given field list.
    pub fn new(fields: &'a [Field]) -> Self {
        let by_id = fields.iter().map(|f| (f.id.as_str(), f)).collect();
        Self { fields, by_id }
    }

    /// Validates a full answer set.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found: required fields are
    /// checked before any individual answer, answers in submission order.
    pub fn validate(&self, answers: &[Answer]) -> ValidationResult<()> {
        self.check_required(answers)?;

        for answer in answers {
            let field = self
                .by_id
                .get(answer.field_id.as_str())
                .ok_or_else(|| ValidationError::unknown_field(&answer.field_id))?;
            check_value(field, &answer.value)?;
        }

        Ok(())
    }

    fn check_required(&self, answers: &[Answer]) -> ValidationResult<()> {
        for field in self.fields.iter().filter(|f| f.required) {
            if !answers.iter().any(|a| a.field_id == field.id) {
                return Err(ValidationError::missing_required(&field.id));
            }
        }
        Ok(())
    }
}

/// Validates `answers` against `fields`.
pub fn validate(fields: &[Field], answers: &[Answer]) -> ValidationResult<()> {
    AnswerValidator::new(fields).validate(answers)
}

/// Checks one value against its field's type and constraints.
fn check_value(field: &Field, value: &AnswerValue) -> ValidationResult<()> {
    match &field.field_type {
        FieldType::Text | FieldType::Textarea => match value {
            AnswerValue::Text(_) => Ok(()),
            other => Err(ValidationError::type_mismatch(
                &field.id,
                "string",
                other.kind_name(),
            )),
        },

        FieldType::Mcq => {
            let AnswerValue::Text(choice) = value else {
                return Err(ValidationError::type_mismatch(
                    &field.id,
                    "string",
                    value.kind_name(),
                ));
            };
            if !field.options.is_empty() && !field.options.iter().any(|o| o == choice) {
                return Err(ValidationError::invalid_option(&field.id, choice));
            }
            Ok(())
        }

        FieldType::Checkbox => check_checkbox(field, value),

        FieldType::Rating => {
            let AnswerValue::Number(score) = value else {
                return Err(ValidationError::type_mismatch(
                    &field.id,
                    "number",
                    value.kind_name(),
                ));
            };
            let score = score.trunc() as i64;
            let (min, max) = field.rating_range();
            if score < min || score > max {
                return Err(ValidationError::out_of_range(&field.id, score, min, max));
            }
            Ok(())
        }

        FieldType::Other(name) => Err(ValidationError::unsupported_type(&field.id, name)),
    }
}

/// Checkbox values must all be options. An empty option list accepts nothing,
/// not even an empty selection.
fn check_checkbox(field: &Field, value: &AnswerValue) -> ValidationResult<()> {
    match value {
        AnswerValue::Choices(choices) => {
            if field.options.is_empty() {
                return Err(ValidationError::invalid_option(
                    &field.id,
                    &format!("{:?}", choices),
                ));
            }
            match choices.iter().find(|&c| !field.options.contains(c)) {
                Some(bad) => Err(ValidationError::invalid_option(&field.id, bad)),
                None => Ok(()),
            }
        }
        // An array with non-string members is a bad selection, not a bad shape.
        AnswerValue::Other(Value::Array(items)) => {
            let shown = items
                .iter()
                .find(|item| !item.is_string())
                .map(Value::to_string)
                .unwrap_or_default();
            Err(ValidationError::invalid_option(&field.id, &shown))
        }
        other => Err(ValidationError::type_mismatch(
            &field.id,
            "array",
            other.kind_name(),
        )),
    }
}
