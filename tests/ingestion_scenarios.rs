//! Ingestion Scenario Tests
//!
//! End-to-end behaviour of the submission pipeline over the in-memory store:
//! - Invalid submissions are rejected and leave no trace
//! - Accepted submissions are counted in the summary
//! - Draft forms never accept submissions
//! - Validation reports the first failing answer

use std::sync::Arc;

use formwire::aggregate::{export_rows, Aggregator};
use formwire::ingest::{Ingestor, RequestMeta, SubmitError, Submission};
use formwire::realtime::Hub;
use formwire::schema::{Answer, Field, FieldType, Form, FormDraft, ValidationErrorKind};
use formwire::storage::{FormStore, MemoryStore};

// =============================================================================
// Test Utilities
// =============================================================================

struct Harness {
    store: Arc<MemoryStore>,
    ingestor: Ingestor,
    aggregator: Aggregator,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    Harness {
        ingestor: Ingestor::new(store.clone(), store.clone(), Arc::new(Hub::new())),
        aggregator: Aggregator::new(store.clone()),
        store,
    }
}

fn survey_fields() -> Vec<Field> {
    vec![
        Field::new("q1", FieldType::Mcq).required().with_options(["yes", "no"]),
        Field::new("tags", FieldType::Checkbox).with_options(["a", "b", "c"]),
        Field::new("score", FieldType::Rating).with_range(1, 10),
        Field::new("note", FieldType::Textarea),
    ]
}

fn published(h: &Harness, fields: Vec<Field>) -> Form {
    let form = h.store.create_form(FormDraft::new("Survey", fields)).unwrap();
    h.store.publish_form(&form.id).unwrap()
}

fn submit(h: &Harness, form: &Form, answers: Vec<Answer>) -> Result<(), SubmitError> {
    h.ingestor
        .submit(Submission::new(&form.id, answers), RequestMeta::default())
        .map(|_| ())
}

// =============================================================================
// Accept / Reject
// =============================================================================

#[test]
fn test_rejected_then_accepted_mcq() {
    let h = harness();
    let form = published(
        &h,
        vec![Field::new("q1", FieldType::Mcq).required().with_options(["yes", "no"])],
    );

    let err = submit(&h, &form, vec![Answer::new("q1", "maybe")]).unwrap_err();
    assert!(matches!(
        err,
        SubmitError::Validation(ref v) if v.kind() == ValidationErrorKind::InvalidOption
    ));
    assert_eq!(h.store.response_count(&form.id), 0);

    submit(&h, &form, vec![Answer::new("q1", "yes")]).unwrap();

    let summary = h.aggregator.summarize(&form.id).unwrap();
    assert_eq!(
        serde_json::to_value(&summary).unwrap(),
        serde_json::json!({"buckets": {"q1": {"yes": 1}}})
    );
}

#[test]
fn test_draft_form_never_accepts() {
    let h = harness();
    let form = h.store.create_form(FormDraft::new("Draft", survey_fields())).unwrap();

    let err = submit(&h, &form, vec![Answer::new("q1", "yes")]).unwrap_err();
    assert_eq!(err, SubmitError::NotPublished(form.id.clone()));

    h.store.publish_form(&form.id).unwrap();
    submit(&h, &form, vec![Answer::new("q1", "yes")]).unwrap();
    assert_eq!(h.store.response_count(&form.id), 1);
}

#[test]
fn test_required_checked_before_other_answers() {
    let h = harness();
    let form = published(&h, survey_fields());

    // Unknown field listed first, but the missing required field wins
    let err = submit(&h, &form, vec![Answer::new("ghost", "x")]).unwrap_err();
    match err {
        SubmitError::Validation(v) => {
            assert_eq!(v.kind(), ValidationErrorKind::MissingRequiredField);
            assert_eq!(v.field_id(), "q1");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_first_failing_answer_reported() {
    let h = harness();
    let form = published(&h, survey_fields());

    let err = submit(
        &h,
        &form,
        vec![
            Answer::new("q1", "yes"),
            Answer::new("score", 11i64),
            Answer::new("tags", vec!["z"]),
        ],
    )
    .unwrap_err();

    match err {
        SubmitError::Validation(v) => {
            assert_eq!(v.kind(), ValidationErrorKind::OutOfRange);
            assert_eq!(v.field_id(), "score");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

// =============================================================================
// Summary / Export agreement
// =============================================================================

#[test]
fn test_summary_and_export_share_canonical_values() {
    let h = harness();
    let form = published(&h, survey_fields());

    submit(
        &h,
        &form,
        vec![
            Answer::new("q1", "no"),
            Answer::new("tags", vec!["a", "c"]),
            Answer::new("score", 7i64),
            Answer::new("note", "fine, thanks"),
        ],
    )
    .unwrap();
    submit(&h, &form, vec![Answer::new("q1", "no"), Answer::new("tags", vec!["a", "c"])]).unwrap();

    let summary = h.aggregator.summarize(&form.id).unwrap();
    assert_eq!(summary.count("q1", "no"), 2);
    assert_eq!(summary.count("tags", "a|c"), 2);
    assert_eq!(summary.count("score", "7"), 1);
    assert_eq!(summary.count("note", "fine, thanks"), 1);

    let rows: Vec<_> = export_rows(h.store.as_ref(), &form.id).unwrap().collect();
    assert_eq!(rows.len(), 6);
    for row in &rows {
        assert!(summary.count(&row.field_id, &row.value) >= 1);
    }
}

#[test]
fn test_summary_of_unknown_form_is_empty() {
    let h = harness();
    let summary = h.aggregator.summarize("no-such-form").unwrap();
    assert!(summary.buckets.is_empty());
}
