//! # Civic Match Core
//!
//! Cross-domain matching for civic and policy records: legislative bills,
//! budget line items, grant/contract projects, and lobbying filings.
//!
//! Given a query record, the engine scores every other record in a
//! [`store::RecordStore`] on five weighted features, ranks them, and can
//! regenerate any pair's score as human-readable statements.
//!
//! This crate contains no tokio, filesystem, or network dependencies. The
//! embedding model and the record store are supplied by the caller.
//!
//! ## Pipeline
//!
//! ```text
//! (kind, id) ──▶ RecordStore ──▶ features + EmbeddingAdapter ──▶ score
//!                                                     │
//!                              ┌──────────────────────┤
//!                              ▼                      ▼
//!                         rank (top-K)          explain (prose)
//! ```
//!
//! Both [`rank::rank`] and [`explain::explain`] call the same
//! [`score::compute_features`] and [`score::score_bundle`], so an
//! explanation can never disagree with a ranking score.

pub mod embedding;
pub mod explain;
pub mod features;
pub mod models;
pub mod rank;
pub mod score;
pub mod similarity;
pub mod store;

pub use embedding::{EmbeddingAdapter, HashingEmbedder, TokenEmbedder};
pub use explain::{explain, Explanation};
pub use models::{EntityKind, Record, RecordRef};
pub use rank::{rank, MatchResult, RankParams, RankStats};
pub use score::{FeatureBundle, FeatureWeights, ScoreBreakdown};
pub use store::RecordStore;
