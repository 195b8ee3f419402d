//! Ranker: scores every candidate against a query record and keeps the
//! top K.
//!
//! # Algorithm
//!
//! 1. Resolve the query by (kind, id). Not found → empty result.
//! 2. Embed the query text once. Failure → the call fails.
//! 3. Collect candidates from each requested kind, in store order,
//!    skipping only the record with the query's exact (kind, id).
//! 4. Embed candidate texts, up to `concurrency` at a time. Results are
//!    consumed in candidate order regardless of completion order.
//!    A failed embedding drops that candidate only.
//! 5. Score each pair via [`compute_features`] + [`score_bundle`].
//! 6. Stable sort by score (desc); ties keep candidate order.
//! 7. Truncate to `limit`.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingAdapter;
use crate::features::text_of;
use crate::models::{EntityKind, Record, RecordRef};
use crate::score::{
    compute_features, score_bundle, FeatureBundle, FeatureWeights, PreparedRecord, ScoreBreakdown,
};
use crate::store::RecordStore;

/// Default number of matches returned.
pub const DEFAULT_LIMIT: usize = 10;
/// Default number of embedding calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Ranking parameters.
#[derive(Debug, Clone)]
pub struct RankParams {
    /// Maximum matches to return.
    pub limit: usize,
    /// Maximum concurrent embedding calls. Config loading rejects 0; library
    /// callers passing 0 get 1.
    pub concurrency: usize,
    /// Candidate kinds to scan. Scanned in [`EntityKind::ALL`] order.
    pub kinds: Vec<EntityKind>,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            kinds: EntityKind::ALL.to_vec(),
        }
    }
}

impl RankParams {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// One scored candidate.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub query: RecordRef,
    pub candidate: RecordRef,
    /// Candidate title, program, or client.
    pub label: String,
    pub score: f64,
    pub features: FeatureBundle,
    pub breakdown: ScoreBreakdown,
}

/// Summary of a ranking call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankStats {
    /// Candidates scanned (query excluded).
    pub candidates_considered: usize,
    /// Candidates dropped because their embedding failed.
    pub candidates_dropped: usize,
    /// Matches returned after truncation.
    pub results_count: usize,
    pub best_score: f64,
    pub mean_score: f64,
    /// Feature contributing most to the best match.
    pub top_feature: Option<String>,
}

impl RankStats {
    fn compute(matches: &[MatchResult], considered: usize, dropped: usize) -> Self {
        if matches.is_empty() {
            return Self {
                candidates_considered: considered,
                candidates_dropped: dropped,
                ..Self::default()
            };
        }
        let sum: f64 = matches.iter().map(|m| m.score).sum();
        Self {
            candidates_considered: considered,
            candidates_dropped: dropped,
            results_count: matches.len(),
            best_score: matches[0].score,
            mean_score: sum / matches.len() as f64,
            top_feature: Some(matches[0].breakdown.top_feature().to_string()),
        }
    }
}

/// Ranked matches plus their summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ranking {
    pub matches: Vec<MatchResult>,
    pub stats: RankStats,
}

/// Rank all candidates against the record `(kind, id)`.
///
/// Returns at most `params.limit` matches sorted by score, highest first.
/// An unknown query yields an empty vector.
pub async fn rank<S: RecordStore + ?Sized>(
    store: &S,
    adapter: &EmbeddingAdapter,
    kind: EntityKind,
    id: &str,
    params: &RankParams,
) -> Result<Vec<MatchResult>> {
    Ok(rank_with_stats(store, adapter, kind, id, params).await?.matches)
}

/// [`rank`], also returning [`RankStats`].
pub async fn rank_with_stats<S: RecordStore + ?Sized>(
    store: &S,
    adapter: &EmbeddingAdapter,
    kind: EntityKind,
    id: &str,
    params: &RankParams,
) -> Result<Ranking> {
    let Some(query) = store.find_record(kind, id).await? else {
        info!(%kind, id, "query record not found");
        return Ok(Ranking::default());
    };
    let query_ref = query.reference();
    let query = PreparedRecord::prepare(adapter, query).await?;

    let mut candidates: Vec<Record> = Vec::new();
    for k in EntityKind::ALL {
        if !params.kinds.contains(&k) {
            continue;
        }
        candidates.extend(
            store
                .records_of_kind(k)
                .await?
                .into_iter()
                .filter(|r| !r.is(kind, id)),
        );
    }
    let considered = candidates.len();

    let embedded: Vec<(Record, String, Result<Vec<f32>>)> = stream::iter(
        candidates.into_iter().map(move |record| async move {
            let text = text_of(&record);
            let vector = adapter.embed(&text).await;
            (record, text, vector)
        }),
    )
    .buffered(params.concurrency.max(1))
    .collect()
    .await;

    let mut dropped = 0usize;
    let mut matches: Vec<MatchResult> = Vec::with_capacity(embedded.len());
    for (record, text, vector) in embedded {
        let vector = match vector {
            Ok(v) => v,
            Err(e) => {
                warn!(candidate = %record.reference(), error = %e, "dropping candidate");
                dropped += 1;
                continue;
            }
        };
        let candidate = PreparedRecord::with_vector(record, text, vector);
        let features = compute_features(&query, &candidate);
        let breakdown = score_bundle(&features, &FeatureWeights::DEFAULT);
        debug!(
            candidate = %candidate.record.reference(),
            score = breakdown.total,
            "scored candidate"
        );
        matches.push(MatchResult {
            query: query_ref.clone(),
            candidate: candidate.record.reference(),
            label: candidate.record.label().to_string(),
            score: breakdown.total,
            features,
            breakdown,
        });
    }

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(params.limit);

    let stats = RankStats::compute(&matches, considered, dropped);
    info!(
        query = %query_ref,
        considered,
        dropped,
        returned = stats.results_count,
        "ranking complete"
    );

    Ok(Ranking { matches, stats })
}
