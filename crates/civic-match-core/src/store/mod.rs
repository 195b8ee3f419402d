//! Record store abstraction.
//!
//! The [`RecordStore`] trait is the engine's only view of the data. It may
//! be backed by static seed data or by live adapters; the ranker and
//! explainer only need ordered collections per kind and lookup by
//! (kind, id).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EntityKind, Record};

/// Read-only source of records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`records_of_kind`](RecordStore::records_of_kind) | All records of a kind, in insertion order |
/// | [`find_record`](RecordStore::find_record) | Lookup by (kind, id) |
///
/// An unknown id is `Ok(None)`, not an error. `Err` is reserved for the
/// backing source itself failing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records of `kind`, in stable insertion order.
    async fn records_of_kind(&self, kind: EntityKind) -> Result<Vec<Record>>;

    /// The record with this (kind, id), if present.
    async fn find_record(&self, kind: EntityKind, id: &str) -> Result<Option<Record>>;
}
