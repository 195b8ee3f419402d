//! `cmatch records <kind>`: list the records of one kind in store order.

use anyhow::Result;

use civic_match_core::features::{resolve_reference_date, resolve_state};
use civic_match_core::{EntityKind, Record, RecordStore};

use crate::config::Config;
use crate::seed::load_seed;

/// Records of `kind`, in store order.
pub async fn list_records(config: &Config, kind: EntityKind) -> Result<Vec<Record>> {
    let store = load_seed(&config.data.seed_path)?;
    store.records_of_kind(kind).await
}

pub async fn run_records(config: &Config, kind: &str, json: bool) -> Result<()> {
    let kind: EntityKind = kind.parse()?;
    let records = list_records(config, kind).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }

    for record in &records {
        println!("{}  {}", record.id(), record.label());
        let state = resolve_state(record).unwrap_or("-");
        let date = resolve_reference_date(record)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("    state: {}  date: {}", state, date);
    }
    println!();
    println!("{} {} record(s)", records.len(), kind);

    Ok(())
}
