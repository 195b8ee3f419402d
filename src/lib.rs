//! # Civic Match
//!
//! Cross-kind matching for civic records: given a bill, budget line,
//! funded project, or lobbying filing, rank the most related records of
//! every kind and explain each match in plain statements.
//!
//! The engine lives in `civic-match-core`. This crate wires it to a
//! TOML configuration, a JSON seed file, configurable embedding
//! providers, and the `cmatch` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ seed.json  │──▶│ RecordStore  │──▶│ rank / explain   │
//! └────────────┘   └──────────────┘   │ (features+score) │
//!                  ┌──────────────┐   │                  │
//!                  │  Embedding   │──▶│                  │
//!                  │  provider    │   └────────┬─────────┘
//!                  └──────────────┘            ▼
//!                                        ┌──────────┐
//!                                        │  cmatch  │
//!                                        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cmatch records bill
//! cmatch rank bill HB-101 --limit 5
//! cmatch explain bill HB-101 budget_line B-EDU-25
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`seed`] | JSON seed data loading |
//! | [`embedding`] | Embedding provider construction |
//! | [`engine`] | Store + adapter composition |
//! | [`rank_cmd`] | `cmatch rank` |
//! | [`explain_cmd`] | `cmatch explain` |
//! | [`records_cmd`] | `cmatch records` |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod embedding;
pub mod engine;
pub mod explain_cmd;
pub mod logging;
pub mod rank_cmd;
pub mod records_cmd;
pub mod seed;
