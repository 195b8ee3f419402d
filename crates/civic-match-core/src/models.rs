//! Record model for the four civic entity kinds.
//!
//! Every record is a variant of the closed [`Record`] enum. Feature
//! extractors match on it exhaustively, so adding a kind is a compile
//! error everywhere a kind-specific rule is needed.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four record kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bill,
    BudgetLine,
    Project,
    LobbyFiling,
}

impl EntityKind {
    /// All kinds, in the order the ranker scans them.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Bill,
        EntityKind::BudgetLine,
        EntityKind::Project,
        EntityKind::LobbyFiling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Bill => "bill",
            EntityKind::BudgetLine => "budget_line",
            EntityKind::Project => "project",
            EntityKind::LobbyFiling => "lobby_filing",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bill" => Ok(EntityKind::Bill),
            "budget_line" => Ok(EntityKind::BudgetLine),
            "project" => Ok(EntityKind::Project),
            "lobby_filing" => Ok(EntityKind::LobbyFiling),
            other => bail!(
                "Unknown record kind: '{}'. Use bill, budget_line, project, or lobby_filing.",
                other
            ),
        }
    }
}

/// Global identity of a record. `id` alone is only unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordRef {
    pub kind: EntityKind,
    pub id: String,
}

impl RecordRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A legislative bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

/// A line item in an enacted budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub id: String,
    pub program: String,
    pub fiscal_year: i32,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Recipient location attached to a grant or contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecipientGeo {
    #[serde(default)]
    pub state: Option<String>,
}

/// A grant or contract award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub recipient_geo: Option<RecipientGeo>,
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

/// A quarterly lobbying disclosure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyFiling {
    pub id: String,
    pub client: String,
    #[serde(default)]
    pub issues: Vec<String>,
    /// Bill ids referenced by the filing.
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub registrant: Option<String>,
    pub quarter: String,
}

/// Any record the engine can score.
///
/// Serialized with an internal `kind` tag, e.g.
/// `{"kind": "bill", "id": "HB-101", "title": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Bill(Bill),
    BudgetLine(BudgetLine),
    Project(Project),
    LobbyFiling(LobbyFiling),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Bill(_) => EntityKind::Bill,
            Record::BudgetLine(_) => EntityKind::BudgetLine,
            Record::Project(_) => EntityKind::Project,
            Record::LobbyFiling(_) => EntityKind::LobbyFiling,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Bill(r) => &r.id,
            Record::BudgetLine(r) => &r.id,
            Record::Project(r) => &r.id,
            Record::LobbyFiling(r) => &r.id,
        }
    }

    pub fn reference(&self) -> RecordRef {
        RecordRef::new(self.kind(), self.id())
    }

    /// Short display name: title, program, or client.
    pub fn label(&self) -> &str {
        match self {
            Record::Bill(r) => &r.title,
            Record::BudgetLine(r) => &r.program,
            Record::Project(r) => &r.title,
            Record::LobbyFiling(r) => &r.client,
        }
    }

    /// True if this record has the given (kind, id) identity.
    pub fn is(&self, kind: EntityKind, id: &str) -> bool {
        self.kind() == kind && self.id() == id
    }
}
