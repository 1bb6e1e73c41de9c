//! Form schema: fields, forms, answers and answer validation
//!
//! # Design Principles
//!
//! - Fields are read-only inputs to validation and aggregation
//! - Validation never mutates or coerces answers
//! - The first failure is reported; errors are not accumulated
//! - `visibleIf` rules are stored and returned, never enforced here

mod answer;
mod errors;
mod types;
mod validator;

pub use answer::{Answer, AnswerValue};
pub use errors::{ValidationError, ValidationErrorKind, ValidationResult};
pub use types::{
    Field, FieldType, Form, FormDraft, FormStatus, VisibilityRule, DEFAULT_RATING_MAX,
    DEFAULT_RATING_MIN, UNTITLED_FORM,
};
pub use validator::{validate, AnswerValidator};
