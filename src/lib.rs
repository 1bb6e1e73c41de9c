//! formwire - form response ingestion with live results
//!
//! Submissions are validated against the form's field schema, stored,
//! and pushed to every observer of that form. Stored responses can be
//! summarised into per-field answer counts or exported as CSV.

pub mod aggregate;
pub mod cli;
pub mod http_server;
pub mod ingest;
pub mod realtime;
pub mod schema;
pub mod storage;
