//! Stored response type

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::Answer;

/// Opaque request metadata (client ip, user agent). Never validated.
pub type ResponseMeta = BTreeMap<String, String>;

/// One respondent's submission against a form.
///
/// Immutable once stored: stores only hand out copies and offer no update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    pub form_id: String,

    pub submitted_at: DateTime<Utc>,

    pub answers: Vec<Answer>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: ResponseMeta,
}

impl Response {
    /// Create a response with a fresh id, stamped now
    pub fn new(form_id: impl Into<String>, answers: Vec<Answer>, meta: ResponseMeta) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            submitted_at: Utc::now(),
            answers,
            meta,
        }
    }
}
