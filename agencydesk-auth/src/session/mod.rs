//! Session management
//!
//! One [`SessionStore`] per user class, backed by a [`KeyValueStore`] for the
//! persisted token/user pair.

pub mod storage;
pub mod store;

pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{LoadPhase, RequestTicket, RestoreOutcome, SessionSnapshot, SessionStore};
