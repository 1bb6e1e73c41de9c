//! # Storage Backend Traits
//!
//! Forms and responses are stored behind two traits so the ingestion path
//! and the HTTP layer never depend on a concrete engine.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{StorageError, StorageResult};
use super::response::Response;
use crate::schema::{Form, FormDraft, FormStatus, UNTITLED_FORM};

/// One-pass sequence of stored responses. Order is unspecified.
pub type ResponseCursor = Box<dyn Iterator<Item = StorageResult<Response>> + Send>;

/// Form document storage
pub trait FormStore: Send + Sync + fmt::Debug {
    /// Create a draft form from client content
    fn create_form(&self, draft: FormDraft) -> StorageResult<Form>;

    /// Fetch a form by id
    fn get_form(&self, id: &str) -> StorageResult<Form>;

    /// Replace title, description and fields
    fn update_form(&self, id: &str, draft: FormDraft) -> StorageResult<Form>;

    /// Flip the form to published
    fn publish_form(&self, id: &str) -> StorageResult<Form>;

    /// Fetch a form that accepts submissions
    fn find_published_form(&self, id: &str) -> StorageResult<Form> {
        let form = self.get_form(id)?;
        if !form.is_published() {
            return Err(StorageError::FormNotPublished(id.to_string()));
        }
        Ok(form)
    }
}

/// Response storage
pub trait ResponseStore: Send + Sync + fmt::Debug {
    /// Persist a response atomically
    fn insert(&self, response: Response) -> StorageResult<Response>;

    /// Stream every response stored for a form
    fn find_by_form(&self, form_id: &str) -> StorageResult<ResponseCursor>;
}

/// Build a new draft form from client content.
pub(crate) fn new_form(draft: FormDraft, now: DateTime<Utc>) -> StorageResult<Form> {
    if let Some(dup) = Form::duplicate_field_id(&draft.fields) {
        return Err(StorageError::DuplicateField(dup.to_string()));
    }

    let title = if draft.title.trim().is_empty() {
        UNTITLED_FORM.to_string()
    } else {
        draft.title
    };

    Ok(Form {
        id: Uuid::new_v4().to_string(),
        owner_id: draft.owner_id,
        title,
        description: draft.description,
        status: FormStatus::Draft,
        created_at: now,
        updated_at: now,
        fields: draft.fields,
    })
}

/// Apply client content to an existing form. Status and creation time stay.
pub(crate) fn apply_update(
    form: &mut Form,
    draft: FormDraft,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    if let Some(dup) = Form::duplicate_field_id(&draft.fields) {
        return Err(StorageError::DuplicateField(dup.to_string()));
    }

    form.title = draft.title;
    form.description = draft.description;
    form.fields = draft.fields;
    touch(form, now);
    Ok(())
}

/// Mark a form published.
pub(crate) fn apply_publish(form: &mut Form, now: DateTime<Utc>) {
    form.status = FormStatus::Published;
    touch(form, now);
}

fn touch(form: &mut Form, now: DateTime<Utc>) {
    form.updated_at = now.max(form.created_at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};
    use chrono::Duration;

    #[test]
    fn test_new_form_defaults() {
        let now = Utc::now();
        let form = new_form(FormDraft::default(), now).unwrap();
        assert_eq!(form.title, UNTITLED_FORM);
        assert_eq!(form.status, FormStatus::Draft);
        assert_eq!(form.created_at, form.updated_at);
    }

    #[test]
    fn test_new_form_rejects_duplicate_ids() {
        let draft = FormDraft::new(
            "Dup",
            vec![Field::new("a", FieldType::Text), Field::new("a", FieldType::Mcq)],
        );
        assert_eq!(
            new_form(draft, Utc::now()).unwrap_err(),
            StorageError::DuplicateField("a".into())
        );
    }

    #[test]
    fn test_updated_at_never_precedes_created_at() {
        let now = Utc::now();
        let mut form = new_form(FormDraft::new("T", vec![]), now).unwrap();

        apply_publish(&mut form, now - Duration::seconds(30));
        assert_eq!(form.updated_at, form.created_at);
        assert!(form.is_published());

        apply_update(&mut form, FormDraft::new("T2", vec![]), now + Duration::seconds(5)).unwrap();
        assert_eq!(form.title, "T2");
        assert!(form.is_published());
        assert!(form.updated_at > form.created_at);
    }
}
