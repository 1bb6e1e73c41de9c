//! Form and field definitions
//!
//! Supported field types:
//! - text / textarea: free-form string
//! - mcq: single choice among `options`
//! - checkbox: any subset of `options`
//! - rating: integer score within `[min, max]` (default 1..=5)
//!
//! Unknown type strings are preserved as written so that validation can
//! reject them explicitly instead of failing to load the form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default lower bound of a rating field
pub const DEFAULT_RATING_MIN: i64 = 1;

/// Default upper bound of a rating field
pub const DEFAULT_RATING_MAX: i64 = 5;

/// Title given to forms created without one
pub const UNTITLED_FORM: &str = "Untitled Form";

/// Question type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Textarea,
    Mcq,
    Checkbox,
    Rating,
    /// A type string this service does not understand
    Other(String),
}

impl FieldType {
    /// Returns the wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Mcq => "mcq",
            FieldType::Checkbox => "checkbox",
            FieldType::Rating => "rating",
            FieldType::Other(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "mcq" => FieldType::Mcq,
            "checkbox" => FieldType::Checkbox,
            "rating" => FieldType::Rating,
            _ => FieldType::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conditional visibility rule.
///
/// Evaluated by the presenting client only; the server stores it opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRule {
    pub field_id: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

/// A single question within a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Unique within the owning form
    pub id: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub required: bool,

    /// Choices for mcq / checkbox fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placeholder: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<VisibilityRule>,
}

impl Field {
    /// Create a field with no constraints
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: String::new(),
            required: false,
            options: Vec::new(),
            min: None,
            max: None,
            placeholder: String::new(),
            visible_if: None,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the choice list
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set explicit rating bounds
    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Effective inclusive rating range
    pub fn rating_range(&self) -> (i64, i64) {
        (
            self.min.unwrap_or(DEFAULT_RATING_MIN),
            self.max.unwrap_or(DEFAULT_RATING_MAX),
        )
    }
}

/// Publication state of a form. Only ever moves draft -> published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormStatus::Draft => write!(f, "draft"),
            FormStatus::Published => write!(f, "published"),
        }
    }
}

/// A form: ordered fields plus publication status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: FormStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Form {
    /// Whether the form accepts submissions
    pub fn is_published(&self) -> bool {
        self.status == FormStatus::Published
    }

    /// Look up a field by id
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Returns the first field id that appears more than once, if any
    pub fn duplicate_field_id(fields: &[Field]) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        fields
            .iter()
            .map(|f| f.id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

/// Client-supplied content of a form, used for create and update.
///
/// Status and timestamps are owned by the store and never taken from input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDraft {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,
}

impl FormDraft {
    pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            fields,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::from("mcq".to_string()), FieldType::Mcq);
        assert_eq!(
            FieldType::from("slider".to_string()),
            FieldType::Other("slider".to_string())
        );
        assert_eq!(String::from(FieldType::Rating), "rating");
        assert_eq!(String::from(FieldType::Other("slider".into())), "slider");
    }

    #[test]
    fn test_rating_range_defaults() {
        let field = Field::new("r", FieldType::Rating);
        assert_eq!(field.rating_range(), (1, 5));

        let field = field.with_range(0, 10);
        assert_eq!(field.rating_range(), (0, 10));
    }

    #[test]
    fn test_visible_if_round_trips() {
        let raw = json!({
            "id": "q2",
            "type": "text",
            "required": false,
            "visibleIf": {"fieldId": "q1", "operator": "equals", "value": ["a", 3]}
        });

        let field: Field = serde_json::from_value(raw.clone()).unwrap();
        let rule = field.visible_if.as_ref().unwrap();
        assert_eq!(rule.field_id, "q1");
        assert_eq!(rule.operator, "equals");

        let back = serde_json::to_value(&field).unwrap();
        assert_eq!(back["visibleIf"], raw["visibleIf"]);
        assert_eq!(back["type"], "text");
    }

    #[test]
    fn test_form_status_wire_names() {
        assert_eq!(serde_json::to_value(FormStatus::Draft).unwrap(), "draft");
        assert_eq!(
            serde_json::from_value::<FormStatus>(json!("published")).unwrap(),
            FormStatus::Published
        );
    }

    #[test]
    fn test_duplicate_field_id() {
        let fields = vec![
            Field::new("a", FieldType::Text),
            Field::new("b", FieldType::Text),
            Field::new("a", FieldType::Rating),
        ];
        assert_eq!(Form::duplicate_field_id(&fields), Some("a"));
        assert_eq!(Form::duplicate_field_id(&fields[..2]), None);
    }
}
