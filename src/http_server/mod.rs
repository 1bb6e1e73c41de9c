//! # HTTP Server Module
//!
//! Axum server exposing form authoring, ingestion, analytics and the live
//! observer socket.
//!
//! # Endpoints
//!
//! - `GET  /api/health` - Health check
//! - `POST /api/forms`, `GET|PUT /api/forms/:id`, `POST /api/forms/:id/publish`
//! - `GET  /api/forms/:id/export` - CSV export
//! - `POST /api/responses` - Submission intake
//! - `GET  /api/analytics/:formId/summary` - Answer counts
//! - `GET  /ws?formId=` - Live `response:created` events

pub mod config;
pub mod errors;
pub mod form_routes;
pub mod observability_routes;
pub mod realtime_routes;
pub mod response_routes;
pub mod server;
pub mod state;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ErrorResponse};
pub use server::{build_router, HttpServer};
pub use state::AppState;
