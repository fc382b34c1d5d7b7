//! Persistence Module
//!
//! Bridges the record store and its on-disk snapshot.
//!
//! ## File Format
//! One flat JSON object, keys sorted, compact encoding:
//! ```text
//! {"alpha":"1","beta":"two"}
//! ```
//! `<`, `>`, `&`, U+2028 and U+2029 are written as `\u` escapes so the file
//! is byte-identical to the `/get` rendering of the same state.
//!
//! ## Lifecycle
//! - `load` at startup: missing or invalid file means an empty store
//! - `dump` after every write: the whole file is rewritten

mod snapshot;

pub use snapshot::{decode, dump, encode, load};
