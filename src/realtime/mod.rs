//! # Real-Time Module
//!
//! Live fan-out of newly stored responses to observers of a form.
//!
//! ## Architecture
//!
//! - **Hub**: per-form observer sets behind a read-mostly lock
//! - **Observer**: a channel handle, one per live connection
//! - **Events**: `response:created` wire messages
//!
//! The websocket transport lives in `http_server::realtime_routes`.

pub mod errors;
pub mod event;
pub mod hub;

pub use errors::{RealtimeError, RealtimeResult};
pub use event::{ResponseEvent, ResponsePayload, RESPONSE_CREATED};
pub use hub::{EventReceiver, EventSender, Hub, Observer, ObserverId, PublishReport};
