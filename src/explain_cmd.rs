//! `cmatch explain <kindA> <idA> <kindB> <idB>`: why two records match.

use anyhow::Result;

use civic_match_core::{explain, EntityKind, Explanation};

use crate::config::Config;
use crate::engine::Engine;

/// Core explain entry point returning structured data.
pub async fn explain_pair(
    config: &Config,
    kind_a: EntityKind,
    id_a: &str,
    kind_b: EntityKind,
    id_b: &str,
) -> Result<Option<Explanation>> {
    let engine = Engine::from_config(config).await?;
    let explanation = explain(&engine.store, &engine.adapter, kind_a, id_a, kind_b, id_b).await;
    engine.shutdown().await?;
    explanation
}

pub async fn run_explain(
    config: &Config,
    kind_a: &str,
    id_a: &str,
    kind_b: &str,
    id_b: &str,
    json: bool,
) -> Result<()> {
    let kind_a: EntityKind = kind_a.parse()?;
    let kind_b: EntityKind = kind_b.parse()?;

    let Some(explanation) = explain_pair(config, kind_a, id_a, kind_b, id_b).await? else {
        if json {
            println!("null");
        } else {
            println!("No matches found.");
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    println!("{} vs {}", explanation.query, explanation.candidate);
    for statement in &explanation.statements {
        println!("  - {}", statement);
    }

    Ok(())
}
