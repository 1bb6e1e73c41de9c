//! Ingestion orchestrator
//!
//! `submit` runs the whole pipeline for one submission:
//!
//! 1. load the published form
//! 2. validate answers against its fields
//! 3. persist the response with request metadata
//! 4. publish `response:created` to the form's observers
//!
//! Persistence completes before the publish call. A publish problem never
//! turns an accepted submission into a rejection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::errors::{SubmitError, SubmitResult};
use crate::realtime::{Hub, PublishReport, ResponseEvent};
use crate::schema::{Answer, AnswerValidator};
use crate::storage::{FormStore, Response, ResponseMeta, ResponseStore};

/// Inbound submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub form_id: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl Submission {
    pub fn new(form_id: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self {
            form_id: form_id.into(),
            answers,
        }
    }
}

/// Transport-level facts about the submitting client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    fn into_meta(self) -> ResponseMeta {
        let mut meta = ResponseMeta::new();
        meta.insert("ip".to_string(), self.ip.unwrap_or_default());
        meta.insert("ua".to_string(), self.user_agent.unwrap_or_default());
        meta
    }
}

/// Acknowledgement of an accepted submission
#[derive(Debug, Clone)]
pub struct Receipt {
    pub response: Response,
    pub broadcast: PublishReport,
}

/// Runs submissions through validation, storage and broadcast
#[derive(Debug, Clone)]
pub struct Ingestor {
    forms: Arc<dyn FormStore>,
    responses: Arc<dyn ResponseStore>,
    hub: Arc<Hub>,
}

impl Ingestor {
    pub fn new(forms: Arc<dyn FormStore>, responses: Arc<dyn ResponseStore>, hub: Arc<Hub>) -> Self {
        Self {
            forms,
            responses,
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Accept or reject one submission.
    ///
    /// # Errors
    ///
    /// - `Malformed` when the form id is blank
    /// - `NotFound` / `NotPublished` from the form lookup
    /// - `Validation` with the first failing answer
    /// - `Storage` when the insert fails
    pub fn submit(&self, submission: Submission, meta: RequestMeta) -> SubmitResult<Receipt> {
        let Submission { form_id, answers } = submission;
        let result = self.ingest(form_id.trim(), answers, meta);
        if let Err(e) = &result {
            debug!(form_id = %form_id, code = e.code(), error = %e, "submission rejected");
        }
        result
    }

    fn ingest(&self, form_id: &str, answers: Vec<Answer>, meta: RequestMeta) -> SubmitResult<Receipt> {
        if form_id.is_empty() {
            return Err(SubmitError::Malformed("formId is required".into()));
        }

        let form = self.forms.find_published_form(form_id)?;
        AnswerValidator::new(&form.fields).validate(&answers)?;

        let stored = self
            .responses
            .insert(Response::new(form_id, answers, meta.into_meta()))
            .map_err(SubmitError::Storage)?;

        let broadcast = self.hub.publish(form_id, ResponseEvent::created(&stored));
        info!(
            form_id,
            response_id = %stored.id,
            observers = broadcast.delivered,
            "response accepted"
        );

        Ok(Receipt {
            response: stored,
            broadcast,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::Observer;
    use crate::schema::{Field, FieldType, Form, FormDraft, ValidationErrorKind};
    use crate::storage::MemoryStore;

    fn setup(publish: bool) -> (Ingestor, Arc<MemoryStore>, Form) {
        let store = Arc::new(MemoryStore::new());
        let mut form = store
            .create_form(FormDraft::new(
                "Poll",
                vec![Field::new("q1", FieldType::Mcq)
                    .required()
                    .with_options(["yes", "no"])],
            ))
            .unwrap();
        if publish {
            form = store.publish_form(&form.id).unwrap();
        }
        let ingestor = Ingestor::new(store.clone(), store.clone(), Arc::new(Hub::new()));
        (ingestor, store, form)
    }

    #[test]
    fn test_accepts_valid_submission() {
        let (ingestor, store, form) = setup(true);
        let meta = RequestMeta {
            ip: Some("10.0.0.1".into()),
            user_agent: Some("curl/8".into()),
        };

        let receipt = ingestor
            .submit(Submission::new(&form.id, vec![Answer::new("q1", "yes")]), meta)
            .unwrap();

        assert_eq!(receipt.response.form_id, form.id);
        assert_eq!(receipt.response.meta["ip"], "10.0.0.1");
        assert_eq!(receipt.response.meta["ua"], "curl/8");
        assert_eq!(store.response_count(&form.id), 1);
    }

    #[test]
    fn test_draft_form_rejected_regardless_of_answers() {
        let (ingestor, store, form) = setup(false);
        let err = ingestor
            .submit(
                Submission::new(&form.id, vec![Answer::new("q1", "yes")]),
                RequestMeta::default(),
            )
            .unwrap_err();
        assert_eq!(err, SubmitError::NotPublished(form.id.clone()));
        assert_eq!(store.response_count(&form.id), 0);
    }

    #[test]
    fn test_unknown_form_rejected() {
        let (ingestor, _, _) = setup(true);
        let err = ingestor
            .submit(Submission::new("nope", vec![]), RequestMeta::default())
            .unwrap_err();
        assert_eq!(err, SubmitError::NotFound("nope".into()));
    }

    #[test]
    fn test_blank_form_id_is_malformed() {
        let (ingestor, _, _) = setup(true);
        let err = ingestor
            .submit(Submission::new("  ", vec![]), RequestMeta::default())
            .unwrap_err();
        assert!(matches!(err, SubmitError::Malformed(_)));
    }

    #[test]
    fn test_invalid_answers_not_stored() {
        let (ingestor, store, form) = setup(true);
        let err = ingestor
            .submit(
                Submission::new(&form.id, vec![Answer::new("q1", "maybe")]),
                RequestMeta::default(),
            )
            .unwrap_err();

        match err {
            SubmitError::Validation(v) => {
                assert_eq!(v.kind(), ValidationErrorKind::InvalidOption);
                assert_eq!(v.field_id(), "q1");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.response_count(&form.id), 0);
    }

    #[tokio::test]
    async fn test_observer_sees_stored_response() {
        let (ingestor, store, form) = setup(true);
        let (observer, mut rx) = Observer::channel();
        ingestor.hub().subscribe(&form.id, &observer).unwrap();

        let receipt = ingestor
            .submit(
                Submission::new(&form.id, vec![Answer::new("q1", "no")]),
                RequestMeta::default(),
            )
            .unwrap();
        assert_eq!(receipt.broadcast.delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.form_id, form.id);
        assert_eq!(event.payload.submitted_at, receipt.response.submitted_at);
        // Stored before the event was published
        assert_eq!(store.response_count(&form.id), 1);
    }
}
