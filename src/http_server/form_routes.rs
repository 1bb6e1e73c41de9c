//! Form HTTP Routes
//!
//! Authoring endpoints: create, read, update, publish, and CSV export of
//! collected responses.
//!
//! Mutations rewrite the forms snapshot with an fsync, so they run on the
//! blocking pool.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::errors::ApiError;
use super::state::AppState;
use crate::aggregate::{csv_lines, export_rows};
use crate::schema::{Form, FormDraft};

/// Lines buffered between the export reader and the response body
const EXPORT_BUFFER: usize = 64;

/// Create form routes
pub fn form_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(create_form_handler))
        .route("/:id", get(get_form_handler).put(update_form_handler))
        .route("/:id/publish", post(publish_form_handler))
        .route("/:id/export", get(export_handler))
        .with_state(state)
}

async fn create_form_handler(
    State(state): State<AppState>,
    body: Result<Json<FormDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Form>), ApiError> {
    let Json(draft) = body?;
    let forms = state.forms.clone();
    let form = tokio::task::spawn_blocking(move || forms.create_form(draft)).await??;
    info!(form_id = %form.id, fields = form.fields.len(), "form created");
    Ok((StatusCode::CREATED, Json(form)))
}

async fn get_form_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Form>, ApiError> {
    Ok(Json(state.forms.get_form(&id)?))
}

async fn update_form_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FormDraft>, JsonRejection>,
) -> Result<Json<Form>, ApiError> {
    let Json(draft) = body?;
    let forms = state.forms.clone();
    let form = tokio::task::spawn_blocking(move || forms.update_form(&id, draft)).await??;
    debug!(form_id = %form.id, "form updated");
    Ok(Json(form))
}

async fn publish_form_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Form>, ApiError> {
    let forms = state.forms.clone();
    let form = tokio::task::spawn_blocking(move || forms.publish_form(&id)).await??;
    info!(form_id = %form.id, "form published");
    Ok(Json(form))
}

/// Stream the CSV export. The store is read on a blocking worker and lines
/// are forwarded as they are produced.
async fn export_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let responses = state.responses.clone();
    let form_id = id.clone();
    let rows = tokio::task::spawn_blocking(move || export_rows(responses.as_ref(), &form_id))
        .await??;

    let (tx, rx) = mpsc::channel::<String>(EXPORT_BUFFER);
    tokio::task::spawn_blocking(move || {
        for line in csv_lines(rows) {
            if tx.blocking_send(line).is_err() {
                debug!("export client went away");
                break;
            }
        }
    });

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (Ok::<_, Infallible>(line), rx))
    }));

    let disposition = format!("attachment; filename=\"form_{}_responses.csv\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
