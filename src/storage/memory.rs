//! In-memory storage engine
//!
//! Both maps sit behind `RwLock`s; responses are grouped per form so a scan
//! only clones the responses it will return.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use super::backend::{apply_publish, apply_update, new_form, FormStore, ResponseCursor, ResponseStore};
use super::errors::{StorageError, StorageResult};
use super::response::Response;
use crate::schema::{Form, FormDraft};

/// Volatile store used by tests and when no data directory is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    forms: RwLock<HashMap<String, Form>>,
    responses: RwLock<HashMap<String, Vec<Response>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a form as-is, keeping its id, status and timestamps
    pub fn put_form(&self, form: Form) -> StorageResult<()> {
        let mut forms = self.forms.write().map_err(|_| poisoned())?;
        forms.insert(form.id.clone(), form);
        Ok(())
    }

    /// Number of responses stored for a form
    pub fn response_count(&self, form_id: &str) -> usize {
        self.responses
            .read()
            .map(|r| r.get(form_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn modify_form<F>(&self, id: &str, f: F) -> StorageResult<Form>
    where
        F: FnOnce(&mut Form) -> StorageResult<()>,
    {
        let mut forms = self.forms.write().map_err(|_| poisoned())?;
        let form = forms
            .get_mut(id)
            .ok_or_else(|| StorageError::FormNotFound(id.to_string()))?;
        f(form)?;
        Ok(form.clone())
    }
}

fn poisoned() -> StorageError {
    StorageError::Internal("Lock poisoned".into())
}

impl FormStore for MemoryStore {
    fn create_form(&self, draft: FormDraft) -> StorageResult<Form> {
        let form = new_form(draft, Utc::now())?;
        self.put_form(form.clone())?;
        Ok(form)
    }

    fn get_form(&self, id: &str) -> StorageResult<Form> {
        let forms = self.forms.read().map_err(|_| poisoned())?;
        forms
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::FormNotFound(id.to_string()))
    }

    fn update_form(&self, id: &str, draft: FormDraft) -> StorageResult<Form> {
        self.modify_form(id, |form| apply_update(form, draft, Utc::now()))
    }

    fn publish_form(&self, id: &str) -> StorageResult<Form> {
        self.modify_form(id, |form| {
            apply_publish(form, Utc::now());
            Ok(())
        })
    }
}

impl ResponseStore for MemoryStore {
    fn insert(&self, response: Response) -> StorageResult<Response> {
        let mut responses = self.responses.write().map_err(|_| poisoned())?;
        responses
            .entry(response.form_id.clone())
            .or_default()
            .push(response.clone());
        Ok(response)
    }

    fn find_by_form(&self, form_id: &str) -> StorageResult<ResponseCursor> {
        let responses = self.responses.read().map_err(|_| poisoned())?;
        let snapshot = responses.get(form_id).cloned().unwrap_or_default();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Answer, Field, FieldType, FormStatus};

    #[test]
    fn test_form_lifecycle() {
        let store = MemoryStore::new();
        let form = store
            .create_form(FormDraft::new("Survey", vec![Field::new("q1", FieldType::Text)]))
            .unwrap();

        assert_eq!(store.get_form(&form.id).unwrap(), form);
        assert!(matches!(
            store.find_published_form(&form.id),
            Err(StorageError::FormNotPublished(_))
        ));

        let published = store.publish_form(&form.id).unwrap();
        assert_eq!(published.status, FormStatus::Published);
        assert_eq!(store.find_published_form(&form.id).unwrap().id, form.id);
    }

    #[test]
    fn test_missing_form() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get_form("nope").unwrap_err(),
            StorageError::FormNotFound("nope".into())
        );
        assert!(store.publish_form("nope").is_err());
    }

    #[test]
    fn test_find_by_form_isolates_forms() {
        let store = MemoryStore::new();
        store
            .insert(Response::new("f1", vec![Answer::new("q", "a")], Default::default()))
            .unwrap();
        store
            .insert(Response::new("f2", vec![Answer::new("q", "b")], Default::default()))
            .unwrap();
        store
            .insert(Response::new("f1", vec![Answer::new("q", "c")], Default::default()))
            .unwrap();

        let found: Vec<_> = store.find_by_form("f1").unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.form_id == "f1"));
        assert_eq!(store.find_by_form("none").unwrap().count(), 0);
        assert_eq!(store.response_count("f2"), 1);
    }
}
