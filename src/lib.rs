//! # SnapKV
//!
//! A small networked key-value store with:
//! - String keys and values written and read over HTTP
//! - JSON, HTML and CSV renderings of the full store
//! - A full-file JSON snapshot rewritten after every write
//! - A single-writer actor that serializes every read and write
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Server                             │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  submit_read / submit_write
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine mailbox                              │
//! │            (bounded crossbeam channel)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one request at a time
//!                       ▼
//!               ┌───────────────┐        ┌─────────────────┐
//!               │ Engine worker │───────▶│  RecordStore    │
//!               │   (thread)    │        │  (owned state)  │
//!               └───────┬───────┘        └─────────────────┘
//!                       │  dump after every write
//!                       ▼
//!               ┌───────────────┐
//!               │ database.json │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod persist;
pub mod engine;
pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SnapError, Result};
pub use config::Config;
pub use engine::Engine;
pub use store::{ReadQuery, Records, WriteBatch};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SnapKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
