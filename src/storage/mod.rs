//! Storage subsystem
//!
//! Forms and responses live behind the `FormStore` / `ResponseStore` traits.
//! Two engines are provided:
//!
//! - `MemoryStore`: volatile, lock-guarded maps
//! - `FileStore`: forms snapshot plus an append-only, checksummed response log
//!
//! Inserts are atomic; a scan reflects every insert committed before it began.

mod backend;
mod errors;
mod file;
mod memory;
mod record;
mod response;

pub use backend::{FormStore, ResponseCursor, ResponseStore};
pub use errors::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{encode_frame, FrameReader};
pub use response::{Response, ResponseMeta};
