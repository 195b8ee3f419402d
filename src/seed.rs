//! Seed data loading.
//!
//! The seed file is a JSON object with one array per entity kind:
//!
//! ```json
//! {
//!   "bills": [{ "id": "HB-101", "title": "...", "subjects": ["education"] }],
//!   "budget_lines": [{ "id": "B-EDU-25", "program": "...", "fiscal_year": 2025 }],
//!   "projects": [],
//!   "lobby_filings": []
//! }
//! ```
//!
//! Missing arrays are empty. Records keep file order within their kind.
//! A repeated (kind, id) replaces the earlier record in place.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use civic_match_core::models::{Bill, BudgetLine, LobbyFiling, Project, Record};
use civic_match_core::store::memory::InMemoryRecordStore;

#[derive(Debug, Deserialize, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub bills: Vec<Bill>,
    #[serde(default)]
    pub budget_lines: Vec<BudgetLine>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub lobby_filings: Vec<LobbyFiling>,
}

impl SeedFile {
    /// All records, grouped by kind in [`EntityKind::ALL`](civic_match_core::EntityKind::ALL) order.
    pub fn into_records(self) -> Vec<Record> {
        let mut records = Vec::with_capacity(
            self.bills.len()
                + self.budget_lines.len()
                + self.projects.len()
                + self.lobby_filings.len(),
        );
        records.extend(self.bills.into_iter().map(Record::Bill));
        records.extend(self.budget_lines.into_iter().map(Record::BudgetLine));
        records.extend(self.projects.into_iter().map(Record::Project));
        records.extend(self.lobby_filings.into_iter().map(Record::LobbyFiling));
        records
    }
}

/// Parse seed JSON into a store.
pub fn parse_seed(json: &str) -> Result<InMemoryRecordStore> {
    let seed: SeedFile = serde_json::from_str(json).context("Failed to parse seed data")?;
    let records = seed.into_records();
    let total = records.len();
    let store = InMemoryRecordStore::from_records(records);
    if store.len() < total {
        warn!(
            duplicates = total - store.len(),
            "seed data repeats record ids; later entries replaced earlier ones"
        );
    }
    Ok(store)
}

/// Read and parse the seed file at `path`.
pub fn load_seed(path: &Path) -> Result<InMemoryRecordStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    let store = parse_seed(&content)
        .with_context(|| format!("Invalid seed file: {}", path.display()))?;
    info!(path = %path.display(), records = store.len(), "loaded seed data");
    Ok(store)
}
