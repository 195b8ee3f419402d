//! Feature extractors: pure functions deriving comparable signals from
//! records.
//!
//! Geography and date resolution are deliberate approximations, isolated
//! in [`resolve_state`] and [`resolve_reference_date`]:
//!
//! - every bill is assumed to originate in [`BILL_HOME_STATE`];
//! - a budget line is dated January 1 of its fiscal year;
//! - lobby filings have neither a state nor a date.
//!
//! Replacing either function with real geocoding or fiscal-calendar logic
//! does not touch the scorer.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Record;
use crate::similarity::jaccard;

/// Jurisdiction every bill is attributed to.
pub const BILL_HOME_STATE: &str = "PA";

/// Text fed to the embedding model and the keyword extractor.
///
/// Name first (title, program, or client), then descriptive fields, then
/// joined subjects or issues, then agency or registrant, separated by
/// single spaces. Absent fields contribute an empty string.
pub fn text_of(record: &Record) -> String {
    let parts: Vec<String> = match record {
        Record::Bill(r) => vec![
            r.title.clone(),
            r.summary.clone().unwrap_or_default(),
            r.subjects.join(" "),
        ],
        Record::BudgetLine(r) => vec![
            r.program.clone(),
            r.subjects.join(" "),
            r.agency.clone().unwrap_or_default(),
        ],
        Record::Project(r) => vec![
            r.title.clone(),
            r.recipient.clone().unwrap_or_default(),
            r.subjects.join(" "),
            r.agency.clone().unwrap_or_default(),
        ],
        Record::LobbyFiling(r) => vec![
            r.client.clone(),
            r.issues.join(" "),
            r.registrant.clone().unwrap_or_default(),
        ],
    };
    parts.join(" ")
}

/// Topic set: `issues` for lobby filings, `subjects` otherwise.
pub fn topics_of(record: &Record) -> BTreeSet<String> {
    let topics = match record {
        Record::Bill(r) => &r.subjects,
        Record::BudgetLine(r) => &r.subjects,
        Record::Project(r) => &r.subjects,
        Record::LobbyFiling(r) => &r.issues,
    };
    topics.iter().cloned().collect()
}

/// Topics present on both records, in sorted order.
pub fn shared_topics(a: &Record, b: &Record) -> Vec<String> {
    topics_of(a)
        .intersection(&topics_of(b))
        .cloned()
        .collect()
}

/// State a record is attributed to, if any.
pub fn resolve_state(record: &Record) -> Option<&str> {
    let state = match record {
        Record::Bill(_) => Some(BILL_HOME_STATE),
        Record::BudgetLine(r) => r.state.as_deref(),
        Record::Project(r) => r.recipient_geo.as_ref().and_then(|g| g.state.as_deref()),
        Record::LobbyFiling(_) => None,
    };
    state.map(str::trim).filter(|s| !s.is_empty())
}

/// Date a record is anchored to, if any.
pub fn resolve_reference_date(record: &Record) -> Option<NaiveDate> {
    match record {
        Record::Bill(r) => r.reference_date,
        Record::BudgetLine(r) => NaiveDate::from_ymd_opt(r.fiscal_year, 1, 1),
        Record::Project(r) => r.reference_date,
        Record::LobbyFiling(_) => None,
    }
}

/// Outcome of comparing two records' resolved states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum GeoOverlap {
    Same { state: String },
    Different { a: String, b: String },
    /// At least one side has no resolvable state.
    Unknown,
}

impl GeoOverlap {
    /// `1.0` same, `0.0` different, `0.5` unknown.
    pub fn value(&self) -> f64 {
        match self {
            GeoOverlap::Same { .. } => 1.0,
            GeoOverlap::Different { .. } => 0.0,
            GeoOverlap::Unknown => 0.5,
        }
    }

    /// The value to score with, or `None` when unresolved.
    pub fn resolved_value(&self) -> Option<f64> {
        match self {
            GeoOverlap::Unknown => None,
            resolved => Some(resolved.value()),
        }
    }
}

/// Compare the resolved states of two records (case-insensitive).
pub fn geo_overlap(a: &Record, b: &Record) -> GeoOverlap {
    match (resolve_state(a), resolve_state(b)) {
        (Some(sa), Some(sb)) if sa.eq_ignore_ascii_case(sb) => GeoOverlap::Same {
            state: sa.to_string(),
        },
        (Some(sa), Some(sb)) => GeoOverlap::Different {
            a: sa.to_string(),
            b: sb.to_string(),
        },
        _ => GeoOverlap::Unknown,
    }
}

/// Absolute distance in days between the two reference dates.
pub fn time_proximity_days(a: &Record, b: &Record) -> Option<f64> {
    let da = resolve_reference_date(a)?;
    let db = resolve_reference_date(b)?;
    Some((da - db).num_days().abs() as f64)
}

/// Lower-cased, whitespace-split word set.
pub fn keyword_set(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard overlap of the two records' [`text_of`] word sets.
pub fn keyword_overlap(a: &Record, b: &Record) -> f64 {
    keyword_overlap_text(&text_of(a), &text_of(b))
}

/// [`keyword_overlap`] over already-assembled texts.
pub fn keyword_overlap_text(a: &str, b: &str) -> f64 {
    jaccard(&keyword_set(a), &keyword_set(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bill, BudgetLine, LobbyFiling, Project, RecipientGeo};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn hb101() -> Record {
        Record::Bill(Bill {
            id: "HB-101".to_string(),
            title: "School Funding Modernization Act".to_string(),
            summary: Some("Updates the basic education funding formula".to_string()),
            subjects: vec!["education".to_string()],
            reference_date: Some(date("2025-03-12")),
        })
    }

    fn b_edu_25() -> Record {
        Record::BudgetLine(BudgetLine {
            id: "B-EDU-25".to_string(),
            program: "Basic Education Funding".to_string(),
            fiscal_year: 2025,
            subjects: vec!["education".to_string()],
            agency: Some("Department of Education".to_string()),
            state: Some("PA".to_string()),
        })
    }

    fn project(state: Option<&str>) -> Record {
        Record::Project(Project {
            id: "P-1".to_string(),
            title: "Rural Broadband".to_string(),
            recipient: None,
            subjects: vec!["broadband".to_string()],
            agency: None,
            recipient_geo: state.map(|s| RecipientGeo {
                state: Some(s.to_string()),
            }),
            reference_date: None,
        })
    }

    fn filing() -> Record {
        Record::LobbyFiling(LobbyFiling {
            id: "L-1".to_string(),
            client: "Teachers Union".to_string(),
            issues: vec!["education".to_string(), "labor".to_string()],
            mentions: vec!["HB-101".to_string()],
            registrant: Some("Capitol Associates".to_string()),
            quarter: "2025Q1".to_string(),
        })
    }

    #[test]
    fn test_text_of_field_order() {
        assert_eq!(
            text_of(&hb101()),
            "School Funding Modernization Act Updates the basic education funding formula education"
        );
        assert_eq!(
            text_of(&b_edu_25()),
            "Basic Education Funding education Department of Education"
        );
        assert_eq!(
            text_of(&filing()),
            "Teachers Union education labor Capitol Associates"
        );
    }

    #[test]
    fn test_text_of_absent_fields_are_empty() {
        assert_eq!(text_of(&project(None)), "Rural Broadband  broadband ");
    }

    #[test]
    fn test_topics_of_uses_issues_for_filings() {
        let topics = topics_of(&filing());
        assert!(topics.contains("labor"));
        assert_eq!(shared_topics(&hb101(), &filing()), vec!["education"]);
    }

    #[test]
    fn test_resolve_state_rules() {
        assert_eq!(resolve_state(&hb101()), Some(BILL_HOME_STATE));
        assert_eq!(resolve_state(&b_edu_25()), Some("PA"));
        assert_eq!(resolve_state(&project(Some("OH"))), Some("OH"));
        assert_eq!(resolve_state(&project(None)), None);
        assert_eq!(resolve_state(&filing()), None);
    }

    #[test]
    fn test_geo_overlap_values() {
        assert_eq!(geo_overlap(&hb101(), &b_edu_25()).value(), 1.0);
        assert_eq!(geo_overlap(&hb101(), &project(Some("OH"))).value(), 0.0);
        let unknown = geo_overlap(&hb101(), &filing());
        assert_eq!(unknown, GeoOverlap::Unknown);
        assert_eq!(unknown.value(), 0.5);
        assert_eq!(unknown.resolved_value(), None);
        assert_eq!(geo_overlap(&project(Some("pa")), &b_edu_25()).value(), 1.0);
    }

    #[test]
    fn test_budget_line_dated_january_first() {
        assert_eq!(resolve_reference_date(&b_edu_25()), Some(date("2025-01-01")));
    }

    #[test]
    fn test_time_proximity_scenario() {
        assert_eq!(time_proximity_days(&hb101(), &b_edu_25()), Some(70.0));
        assert_eq!(time_proximity_days(&b_edu_25(), &hb101()), Some(70.0));
        assert_eq!(time_proximity_days(&hb101(), &filing()), None);
        assert_eq!(time_proximity_days(&hb101(), &project(None)), None);
    }

    #[test]
    fn test_keyword_overlap_is_case_insensitive() {
        let overlap = keyword_overlap_text("Basic Education", "education FUNDING basic");
        assert!((overlap - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(keyword_overlap_text("", ""), 0.0);
    }
}
