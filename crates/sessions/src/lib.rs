//! Per-requester session state.
//!
//! Remembers the last artifact each requester produced so a follow-up
//! "modify" request has something to work on. State lives in process memory
//! only and is bounded by a TTL and an entry cap.

pub mod store;

pub use store::{SessionRecord, SessionStore};
