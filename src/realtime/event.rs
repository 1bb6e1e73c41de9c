//! # Real-Time Events
//!
//! Events pushed to observers when a response is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{RealtimeError, RealtimeResult};
use crate::schema::Answer;
use crate::storage::Response;

/// Event type tag for a newly stored response
pub const RESPONSE_CREATED: &str = "response:created";

/// Body of a `response:created` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub answers: Vec<Answer>,
    pub submitted_at: DateTime<Utc>,
}

/// Event delivered to observers of one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub form_id: String,
    pub payload: ResponsePayload,
}

impl ResponseEvent {
    /// Create a `response:created` event for a stored response
    pub fn created(response: &Response) -> Self {
        Self {
            event_type: RESPONSE_CREATED.to_string(),
            form_id: response.form_id.clone(),
            payload: ResponsePayload {
                answers: response.answers.clone(),
                submitted_at: response.submitted_at,
            },
        }
    }

    /// Serialize to wire format
    pub fn to_wire_format(&self) -> RealtimeResult<String> {
        serde_json::to_string(self).map_err(|e| RealtimeError::InvalidMessage(e.to_string()))
    }
}
