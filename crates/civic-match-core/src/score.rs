//! Weighted multi-feature scoring.
//!
//! # Scoring
//!
//! | feature | weight | included when |
//! |---------|--------|---------------|
//! | embedding cosine | 0.35 | always |
//! | topic Jaccard | 0.20 | always |
//! | geography overlap | 0.20 | both states resolved |
//! | time proximity | 0.15 | both dates resolved |
//! | keyword Jaccard | 0.10 | always |
//!
//! `score = Σ weight × value` over the included features. Weights of
//! absent features are not redistributed, so a pair without geography or
//! dates scores lower than a fully populated one. A lobby filing, which
//! has neither, can score at most `0.65`.
//!
//! Time is converted to a similarity before weighting:
//! `time_score = max(0, 1 - days / 365)`.

use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;

use crate::embedding::EmbeddingAdapter;
use crate::features::{self, GeoOverlap};
use crate::models::Record;
use crate::similarity::{cosine, jaccard};

/// Days at which time proximity decays to zero.
pub const TIME_DECAY_DAYS: f64 = 365.0;

/// Per-feature weights. [`FeatureWeights::DEFAULT`] is the only set used
/// for ranking and explaining.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureWeights {
    pub embedding: f64,
    pub topics: f64,
    pub geography: f64,
    pub time: f64,
    pub keywords: f64,
}

impl FeatureWeights {
    pub const DEFAULT: FeatureWeights = FeatureWeights {
        embedding: 0.35,
        topics: 0.20,
        geography: 0.20,
        time: 0.15,
        keywords: 0.10,
    };

    /// Sum of all weights: the maximum score of a fully populated pair.
    pub fn total(&self) -> f64 {
        self.embedding + self.topics + self.geography + self.time + self.keywords
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Linear decay from 1 at zero days to 0 at [`TIME_DECAY_DAYS`] and beyond.
pub fn time_score(days: f64) -> f64 {
    (1.0 - days / TIME_DECAY_DAYS).max(0.0)
}

/// The five comparable values for one record pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureBundle {
    /// Cosine of the two pooled embeddings, floored at 0.
    pub embedding_similarity: f64,
    /// Jaccard index of the topic sets.
    pub topic_overlap: f64,
    pub geo: GeoOverlap,
    /// Absent when either date is unresolved.
    pub time_proximity_days: Option<f64>,
    /// Jaccard index of the keyword sets.
    pub keyword_overlap: f64,
}

impl FeatureBundle {
    /// Geography value to score with, absent when unresolved.
    pub fn geo_overlap(&self) -> Option<f64> {
        self.geo.resolved_value()
    }

    /// Time proximity converted to a similarity.
    pub fn time_score(&self) -> Option<f64> {
        self.time_proximity_days.map(time_score)
    }
}

/// Weighted contribution of each feature. Absent features are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub embedding: f64,
    pub topics: f64,
    pub geography: Option<f64>,
    pub time: Option<f64>,
    pub keywords: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Name of the feature with the largest contribution.
    pub fn top_feature(&self) -> &'static str {
        let mut best = ("embedding", self.embedding);
        let rest = [
            ("topics", Some(self.topics)),
            ("geography", self.geography),
            ("time", self.time),
            ("keywords", Some(self.keywords)),
        ];
        for (name, value) in rest {
            if let Some(v) = value {
                if v > best.1 {
                    best = (name, v);
                }
            }
        }
        best.0
    }
}

/// Combine a feature bundle into weighted contributions and a total.
pub fn score_bundle(features: &FeatureBundle, weights: &FeatureWeights) -> ScoreBreakdown {
    let embedding = weights.embedding * features.embedding_similarity;
    let topics = weights.topics * features.topic_overlap;
    let geography = features.geo_overlap().map(|g| weights.geography * g);
    let time = features.time_score().map(|t| weights.time * t);
    let keywords = weights.keywords * features.keyword_overlap;

    let total = embedding + topics + geography.unwrap_or(0.0) + time.unwrap_or(0.0) + keywords;

    ScoreBreakdown {
        embedding,
        topics,
        geography,
        time,
        keywords,
        total,
    }
}

/// A record with everything the scorer derives from it alone.
///
/// Preparing once and comparing many times is how the ranker avoids
/// re-embedding the query for every candidate.
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    pub record: Record,
    pub text: String,
    pub topics: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
    pub vector: Vec<f32>,
}

impl PreparedRecord {
    /// Extract text, topics, and keywords, and embed the text.
    pub async fn prepare(adapter: &EmbeddingAdapter, record: Record) -> Result<Self> {
        let text = features::text_of(&record);
        let vector = adapter.embed(&text).await?;
        Ok(Self::with_vector(record, text, vector))
    }

    /// Build from an already computed embedding of `text`.
    pub fn with_vector(record: Record, text: String, vector: Vec<f32>) -> Self {
        let topics = features::topics_of(&record);
        let keywords = features::keyword_set(&text);
        Self {
            record,
            text,
            topics,
            keywords,
            vector,
        }
    }
}

/// The feature bundle for a pair. Shared by the ranker and the explainer.
pub fn compute_features(a: &PreparedRecord, b: &PreparedRecord) -> FeatureBundle {
    FeatureBundle {
        embedding_similarity: cosine(&a.vector, &b.vector).max(0.0),
        topic_overlap: jaccard(&a.topics, &b.topics),
        geo: features::geo_overlap(&a.record, &b.record),
        time_proximity_days: features::time_proximity_days(&a.record, &b.record),
        keyword_overlap: jaccard(&a.keywords, &b.keywords),
    }
}

/// Score one pair of records with the default weights.
///
/// # Errors
///
/// Only an embedding failure is an error; every structurally valid pair
/// otherwise produces a score.
pub async fn score(
    adapter: &EmbeddingAdapter,
    a: &Record,
    b: &Record,
) -> Result<(f64, FeatureBundle)> {
    let pa = PreparedRecord::prepare(adapter, a.clone()).await?;
    let pb = PreparedRecord::prepare(adapter, b.clone()).await?;
    let features = compute_features(&pa, &pb);
    let breakdown = score_bundle(&features, &FeatureWeights::DEFAULT);
    Ok((breakdown.total, features))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(geo: GeoOverlap, days: Option<f64>) -> FeatureBundle {
        FeatureBundle {
            embedding_similarity: 1.0,
            topic_overlap: 1.0,
            geo,
            time_proximity_days: days,
            keyword_overlap: 1.0,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((FeatureWeights::DEFAULT.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_score_decay() {
        assert_eq!(time_score(0.0), 1.0);
        assert!((time_score(70.0) - (1.0 - 70.0 / 365.0)).abs() < 1e-12);
        assert_eq!(time_score(365.0), 0.0);
        assert_eq!(time_score(1000.0), 0.0);
    }

    #[test]
    fn test_perfect_pair_scores_one() {
        let features = bundle(
            GeoOverlap::Same {
                state: "PA".to_string(),
            },
            Some(0.0),
        );
        let breakdown = score_bundle(&features, &FeatureWeights::DEFAULT);
        assert!((breakdown.total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_absent_features_are_not_redistributed() {
        let features = bundle(GeoOverlap::Unknown, None);
        let breakdown = score_bundle(&features, &FeatureWeights::DEFAULT);
        assert_eq!(breakdown.geography, None);
        assert_eq!(breakdown.time, None);
        assert!((breakdown.total - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_different_states_contribute_zero() {
        let features = bundle(
            GeoOverlap::Different {
                a: "PA".to_string(),
                b: "OH".to_string(),
            },
            None,
        );
        let breakdown = score_bundle(&features, &FeatureWeights::DEFAULT);
        assert_eq!(breakdown.geography, Some(0.0));
    }

    #[test]
    fn test_top_feature() {
        let breakdown = ScoreBreakdown {
            embedding: 0.1,
            topics: 0.2,
            geography: Some(0.05),
            time: None,
            keywords: 0.01,
            total: 0.36,
        };
        assert_eq!(breakdown.top_feature(), "topics");
    }
}
