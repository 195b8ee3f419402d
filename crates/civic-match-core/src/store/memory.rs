//! In-memory [`RecordStore`] over an immutable snapshot.
//!
//! Records are grouped by kind and kept in insertion order. The store is
//! built up front and never mutated while a ranking or explanation is in
//! flight, so reads take no locks.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EntityKind, Record};

use super::RecordStore;

/// In-memory record store for seed data and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    by_kind: HashMap<EntityKind, Vec<Record>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records, keeping their order.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert a record. A record with the same (kind, id) is replaced in
    /// place, keeping its original position.
    pub fn insert(&mut self, record: Record) {
        let bucket = self.by_kind.entry(record.kind()).or_default();
        match bucket.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => bucket.push(record),
        }
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn records_of_kind(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(self.by_kind.get(&kind).cloned().unwrap_or_default())
    }

    async fn find_record(&self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        Ok(self
            .by_kind
            .get(&kind)
            .and_then(|bucket| bucket.iter().find(|r| r.id() == id))
            .cloned())
    }
}
