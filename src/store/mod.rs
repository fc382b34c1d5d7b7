//! Store Module
//!
//! The in-memory record store owned by the engine worker.
//!
//! ## Responsibilities
//! - Merge write batches as a single unit
//! - Answer full-snapshot and single-key queries with independent copies
//! - Full enumeration for persistence and rendering
//!
//! ## Data Structure Choice
//! A plain `HashMap` with no interior locking. Only the engine worker thread
//! ever touches it, so every access is already serialized.

mod table;

use std::collections::HashMap;

pub use table::RecordStore;

/// Key/value mapping as stored and as returned to readers
pub type Records = HashMap<String, String>;

/// A set of key/value pairs merged into the store in one step.
///
/// Iteration order is unspecified; each key appears at most once.
pub type WriteBatch = HashMap<String, String>;

/// Shape of a read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadQuery {
    /// Copy of the whole store
    All,

    /// Single key; an absent key reads as the empty string
    Key(String),

    /// Reserved. Always answered with `SnapError::NotImplemented`.
    Filter(String),
}
