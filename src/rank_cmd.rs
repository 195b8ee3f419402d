//! `cmatch rank <kind> <id>`: top matches for one record across kinds.

use anyhow::{Context, Result};

use civic_match_core::rank::{rank_with_stats, Ranking};
use civic_match_core::{EntityKind, RankParams};

use crate::config::Config;
use crate::engine::Engine;

/// Parse a comma-separated kind list such as `budget_line,project`.
pub fn parse_kinds(value: &str) -> Result<Vec<EntityKind>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<EntityKind>())
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Invalid --kinds value: '{}'", value))
}

/// Ranking parameters from config defaults and CLI overrides.
pub fn rank_params(
    config: &Config,
    limit: Option<usize>,
    kinds: Option<&str>,
) -> Result<RankParams> {
    let mut params = RankParams {
        limit: limit.unwrap_or(config.ranking.default_limit),
        concurrency: config.ranking.concurrency,
        ..RankParams::default()
    };
    if let Some(list) = kinds {
        params.kinds = parse_kinds(list)?;
    }
    Ok(params)
}

/// Core ranking entry point returning structured data.
pub async fn rank_record(
    config: &Config,
    kind: EntityKind,
    id: &str,
    params: &RankParams,
) -> Result<Ranking> {
    let engine = Engine::from_config(config).await?;
    let ranking = rank_with_stats(&engine.store, &engine.adapter, kind, id, params).await;
    engine.shutdown().await?;
    ranking
}

pub async fn run_rank(
    config: &Config,
    kind: &str,
    id: &str,
    limit: Option<usize>,
    kinds: Option<String>,
    json: bool,
) -> Result<()> {
    let kind: EntityKind = kind.parse()?;
    let params = rank_params(config, limit, kinds.as_deref())?;
    let ranking = rank_record(config, kind, id, &params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
        return Ok(());
    }

    if ranking.matches.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    for (i, m) in ranking.matches.iter().enumerate() {
        println!("{}. [{:.3}] {}  {}", i + 1, m.score, m.candidate, m.label);
        println!(
            "    embedding {:.3}  topics {:.3}  geography {}  time {}  keywords {:.3}",
            m.breakdown.embedding,
            m.breakdown.topics,
            fmt_optional(m.breakdown.geography),
            fmt_optional(m.breakdown.time),
            m.breakdown.keywords,
        );
    }

    let stats = &ranking.stats;
    println!();
    println!(
        "{} of {} candidates shown, {} dropped; best {:.3}, mean {:.3}",
        stats.results_count,
        stats.candidates_considered,
        stats.candidates_dropped,
        stats.best_score,
        stats.mean_score
    );

    Ok(())
}

fn fmt_optional(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "n/a".to_string())
}
