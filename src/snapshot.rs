//! Records and snapshots moved through the pipeline.

use serde_json::Value;

/// One opaque player record. No schema is enforced; key order is kept as
/// received.
pub type Record = Value;

/// All records returned by one fetch, written as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    records: Vec<Record>,
}

impl FeedSnapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parses a response body that must be a JSON array.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let records: Vec<Record> = serde_json::from_slice(bytes)?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
