//! RecordStore: the current roster snapshot
//!
//! Snapshots are replaced wholesale; the last adopted snapshot wins and
//! partial snapshots are never merged.

use std::collections::HashSet;

use roster_common::Record;

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    /// Field names of the first record ever adopted
    schema: Vec<String>,
    /// Bumped on every adoption
    generation: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Returns true if this adoption discovered the schema.
    pub fn adopt(&mut self, records: Vec<Record>) -> bool {
        let discovered = self.schema.is_empty() && !records.is_empty();
        if discovered {
            self.schema = records[0].field_names().map(str::to_string).collect();
        }
        self.records = records;
        self.generation += 1;
        discovered
    }

    pub fn all(&self) -> &[Record] {
        &self.records
    }

    pub fn find(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name() == name)
    }

    /// Live identifier set, used to prune selections
    pub fn names(&self) -> HashSet<&str> {
        self.records.iter().map(Record::name).collect()
    }

    /// First `count` names in backend order
    pub fn recent(&self, count: usize) -> Vec<String> {
        self.records
            .iter()
            .take(count)
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
