//! Explainer: renders a pair's score as ordered, human-readable
//! statements.
//!
//! The explainer recomputes the pair through the same
//! [`compute_features`] and [`score_bundle`] the ranker uses, with
//! [`FeatureWeights::DEFAULT`]. Every percentage shown is the value used
//! in scoring, formatted to one decimal place.
//!
//! Statement order:
//!
//! 1. Semantic (embedding) similarity and its weight
//! 2. Shared topics, or "No shared topic categories"
//! 3. Geography (only when both states resolve)
//! 4. Time proximity in days and converted score (only when both dates resolve)
//! 5. Keyword overlap (only when above zero)
//! 6. Final match score

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::embedding::EmbeddingAdapter;
use crate::features::{shared_topics, GeoOverlap};
use crate::models::{EntityKind, RecordRef};
use crate::score::{
    compute_features, score_bundle, FeatureBundle, FeatureWeights, PreparedRecord, ScoreBreakdown,
};
use crate::store::RecordStore;

/// Statement rendered when two records share no topic.
pub const NO_SHARED_TOPICS: &str = "No shared topic categories";

/// A rendered explanation and the numbers behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub query: RecordRef,
    pub candidate: RecordRef,
    pub statements: Vec<String>,
    pub shared_topics: Vec<String>,
    pub features: FeatureBundle,
    pub weights: FeatureWeights,
    pub breakdown: ScoreBreakdown,
    pub score: f64,
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Render the statements for a computed pair.
pub fn render_statements(
    features: &FeatureBundle,
    breakdown: &ScoreBreakdown,
    weights: &FeatureWeights,
    shared: &[String],
) -> Vec<String> {
    let mut out = Vec::with_capacity(6);

    out.push(format!(
        "Semantic similarity {} (weight {})",
        pct(features.embedding_similarity),
        pct(weights.embedding)
    ));

    if shared.is_empty() {
        out.push(NO_SHARED_TOPICS.to_string());
    } else {
        out.push(format!(
            "Shared topics: {} (topic overlap {}, weight {})",
            shared.join(", "),
            pct(features.topic_overlap),
            pct(weights.topics)
        ));
    }

    match &features.geo {
        GeoOverlap::Same { state } => out.push(format!(
            "Same state: {} (geography {}, weight {})",
            state,
            pct(features.geo.value()),
            pct(weights.geography)
        )),
        GeoOverlap::Different { a, b } => out.push(format!(
            "Different states: {} vs {} (geography {}, weight {})",
            a,
            b,
            pct(features.geo.value()),
            pct(weights.geography)
        )),
        GeoOverlap::Unknown => {}
    }

    if let (Some(days), Some(time)) = (features.time_proximity_days, features.time_score()) {
        out.push(format!(
            "Dates {:.0} days apart (time score {}, weight {})",
            days,
            pct(time),
            pct(weights.time)
        ));
    }

    if features.keyword_overlap > 0.0 {
        out.push(format!(
            "Keyword overlap {} (weight {})",
            pct(features.keyword_overlap),
            pct(weights.keywords)
        ));
    }

    out.push(format!("Match score {}", pct(breakdown.total)));
    out
}

/// Explain the score between `(kind_a, id_a)` and `(kind_b, id_b)`.
///
/// Returns `Ok(None)` if either record is not in the store.
///
/// # Errors
///
/// Fails if the store or the embedding model fails.
pub async fn explain<S: RecordStore + ?Sized>(
    store: &S,
    adapter: &EmbeddingAdapter,
    kind_a: EntityKind,
    id_a: &str,
    kind_b: EntityKind,
    id_b: &str,
) -> Result<Option<Explanation>> {
    let Some(a) = store.find_record(kind_a, id_a).await? else {
        info!(kind = %kind_a, id = id_a, "explain: record not found");
        return Ok(None);
    };
    let Some(b) = store.find_record(kind_b, id_b).await? else {
        info!(kind = %kind_b, id = id_b, "explain: record not found");
        return Ok(None);
    };

    let pa = PreparedRecord::prepare(adapter, a).await?;
    let pb = PreparedRecord::prepare(adapter, b).await?;

    let weights = FeatureWeights::DEFAULT;
    let features = compute_features(&pa, &pb);
    let breakdown = score_bundle(&features, &weights);
    let shared = shared_topics(&pa.record, &pb.record);
    let statements = render_statements(&features, &breakdown, &weights, &shared);

    Ok(Some(Explanation {
        query: pa.record.reference(),
        candidate: pb.record.reference(),
        statements,
        shared_topics: shared,
        features,
        weights,
        score: breakdown.total,
        breakdown,
    }))
}
