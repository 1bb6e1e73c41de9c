//! Aggregation and export
//!
//! Both read the response store on demand and never touch the live hub.
//! They share one canonicalisation so summary keys and exported values agree.

mod canonical;
mod export;
mod summary;

pub use canonical::{canonical_key, LIST_SEPARATOR};
pub use export::{
    csv_lines, export_rows, strict_export_rows, write_csv, write_export, ExportRow, ExportRows,
    CSV_HEADER,
};
pub use summary::{summarize_responses, Aggregator, FieldBuckets, Summary};
