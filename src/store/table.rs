//! RecordStore implementation

use crate::error::{Result, SnapError};
use super::{ReadQuery, Records, WriteBatch};

/// Authoritative key/value state.
///
/// Not `Sync`-shared anywhere: the engine worker owns it by value.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Records,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with previously persisted records
    pub fn from_records(records: Records) -> Self {
        Self { records }
    }

    /// Merge a batch, last writer wins per key
    pub fn apply(&mut self, batch: WriteBatch) {
        self.records.extend(batch);
    }

    /// Answer a query with a mapping independent of the store
    pub fn read(&self, query: &ReadQuery) -> Result<Records> {
        match query {
            ReadQuery::All => Ok(self.records.clone()),
            ReadQuery::Key(key) => {
                let value = self.records.get(key).cloned().unwrap_or_default();
                Ok(Records::from([(key.clone(), value)]))
            }
            ReadQuery::Filter(expr) => Err(SnapError::NotImplemented(format!(
                "filter queries are not supported (filter: {:?})",
                expr
            ))),
        }
    }

    /// Borrow the live records (persistence only)
    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
