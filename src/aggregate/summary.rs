//! Per-field value histograms
//!
//! Buckets are derived on every request and never stored. The output maps
//! are ordered so repeated summaries over the same data compare equal.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::canonical::canonical_key;
use crate::schema::Answer;
use crate::storage::{Response, ResponseStore, StorageResult};

/// canonical value -> count, for one field
pub type FieldBuckets = BTreeMap<String, u64>;

/// Aggregated answer counts for one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// field id -> canonical value -> count
    pub buckets: BTreeMap<String, FieldBuckets>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one answer
    pub fn record(&mut self, answer: &Answer) {
        *self
            .buckets
            .entry(answer.field_id.clone())
            .or_default()
            .entry(canonical_key(&answer.value))
            .or_insert(0) += 1;
    }

    /// Count every answer of a response
    pub fn record_response(&mut self, response: &Response) {
        for answer in &response.answers {
            self.record(answer);
        }
    }

    /// Count for one `(field, canonical value)` pair
    pub fn count(&self, field_id: &str, key: &str) -> u64 {
        self.buckets
            .get(field_id)
            .and_then(|b| b.get(key))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all bucket counts for a field
    pub fn field_total(&self, field_id: &str) -> u64 {
        self.buckets
            .get(field_id)
            .map(|b| b.values().sum())
            .unwrap_or(0)
    }
}

/// Fold a response stream into a summary.
///
/// # Errors
///
/// Stops at the first storage error from the stream.
pub fn summarize_responses<I>(responses: I) -> StorageResult<Summary>
where
    I: IntoIterator<Item = StorageResult<Response>>,
{
    let mut summary = Summary::new();
    for response in responses {
        summary.record_response(&response?);
    }
    Ok(summary)
}

/// Computes summaries from a response store
#[derive(Debug, Clone)]
pub struct Aggregator {
    store: Arc<dyn ResponseStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ResponseStore>) -> Self {
        Self { store }
    }

    /// Summarise every stored response for `form_id`
    pub fn summarize(&self, form_id: &str) -> StorageResult<Summary> {
        summarize_responses(self.store.find_by_form(form_id)?)
    }
}
