//! Engine-level properties: determinism, symmetry, self-exclusion,
//! bounded output, and explainer/scorer agreement.

use std::sync::Arc;

use chrono::NaiveDate;
use civic_match_core::models::{Bill, BudgetLine, LobbyFiling, Project, RecipientGeo};
use civic_match_core::rank::rank_with_stats;
use civic_match_core::score::{score, score_bundle};
use civic_match_core::store::memory::InMemoryRecordStore;
use civic_match_core::{
    explain, rank, EmbeddingAdapter, EntityKind, FeatureWeights, HashingEmbedder, RankParams,
    Record, RecordStore,
};

fn date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn fixtures() -> Vec<Record> {
    vec![
        Record::Bill(Bill {
            id: "HB-101".to_string(),
            title: "School Funding Modernization Act".to_string(),
            summary: Some("Revises the basic education funding formula for school districts".to_string()),
            subjects: strings(&["education"]),
            reference_date: date("2025-03-12"),
        }),
        Record::Bill(Bill {
            id: "SB-220".to_string(),
            title: "Rural Broadband Expansion".to_string(),
            summary: None,
            subjects: strings(&["broadband", "rural development"]),
            reference_date: date("2024-06-01"),
        }),
        Record::BudgetLine(BudgetLine {
            id: "B-EDU-25".to_string(),
            program: "Basic Education Funding".to_string(),
            fiscal_year: 2025,
            subjects: strings(&["education"]),
            agency: Some("Department of Education".to_string()),
            state: Some("PA".to_string()),
        }),
        Record::BudgetLine(BudgetLine {
            id: "B-TRN-25".to_string(),
            program: "Highway Maintenance".to_string(),
            fiscal_year: 2025,
            subjects: strings(&["transportation"]),
            agency: Some("Department of Transportation".to_string()),
            state: Some("OH".to_string()),
        }),
        Record::Project(Project {
            id: "G-5501".to_string(),
            title: "School District Literacy Grant".to_string(),
            recipient: Some("Harrisburg School District".to_string()),
            subjects: strings(&["education"]),
            agency: Some("Department of Education".to_string()),
            recipient_geo: Some(RecipientGeo {
                state: Some("PA".to_string()),
            }),
            reference_date: date("2025-02-20"),
        }),
        Record::Project(Project {
            id: "G-7000".to_string(),
            title: "Broadband Infrastructure Award".to_string(),
            recipient: None,
            subjects: strings(&["broadband"]),
            agency: None,
            recipient_geo: None,
            reference_date: None,
        }),
        Record::LobbyFiling(LobbyFiling {
            id: "L-2025-01".to_string(),
            client: "Statewide Teachers Association".to_string(),
            issues: strings(&["education", "labor"]),
            mentions: strings(&["HB-101"]),
            registrant: Some("Capitol Strategies".to_string()),
            quarter: "2025Q1".to_string(),
        }),
        // Shares an id string with a bill; identity is (kind, id).
        Record::LobbyFiling(LobbyFiling {
            id: "HB-101".to_string(),
            client: "Rural Internet Coalition".to_string(),
            issues: strings(&["broadband"]),
            mentions: vec![],
            registrant: None,
            quarter: "2024Q3".to_string(),
        }),
    ]
}

fn adapter() -> EmbeddingAdapter {
    EmbeddingAdapter::new(Arc::new(HashingEmbedder::new(256)))
}

#[tokio::test]
async fn score_is_deterministic() {
    let adapter = adapter();
    let records = fixtures();
    for a in &records {
        for b in &records {
            let (s1, f1) = score(&adapter, a, b).await.unwrap();
            let (s2, f2) = score(&adapter, a, b).await.unwrap();
            assert_eq!(s1, s2);
            assert_eq!(f1, f2);
        }
    }
}

#[tokio::test]
async fn score_is_symmetric_within_and_across_kinds() {
    let adapter = adapter();
    let records = fixtures();
    for a in &records {
        for b in &records {
            let (ab, _) = score(&adapter, a, b).await.unwrap();
            let (ba, _) = score(&adapter, b, a).await.unwrap();
            assert_eq!(ab, ba, "{} vs {}", a.reference(), b.reference());
        }
    }
}

#[tokio::test]
async fn scores_stay_within_weight_total() {
    let adapter = adapter();
    let records = fixtures();
    let max = FeatureWeights::DEFAULT.total();
    for a in &records {
        for b in &records {
            let (s, _) = score(&adapter, a, b).await.unwrap();
            assert!(s >= 0.0 && s <= max + 1e-9, "score out of range: {}", s);
        }
    }
}

#[tokio::test]
async fn lobby_filings_cap_at_065() {
    let adapter = adapter();
    let records = fixtures();
    let filing = records
        .iter()
        .find(|r| r.kind() == EntityKind::LobbyFiling)
        .unwrap();
    for other in &records {
        let (s, _) = score(&adapter, filing, other).await.unwrap();
        assert!(s <= 0.65 + 1e-9);
    }
}

#[tokio::test]
async fn ranking_excludes_self_and_is_bounded() {
    let store = InMemoryRecordStore::from_records(fixtures());
    let adapter = adapter();
    for record in fixtures() {
        for limit in [0usize, 1, 3, 10] {
            let results = rank(
                &store,
                &adapter,
                record.kind(),
                record.id(),
                &RankParams::with_limit(limit),
            )
            .await
            .unwrap();
            assert!(results.len() <= limit);
            assert!(results.iter().all(|m| m.candidate != record.reference()));
            for pair in results.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}

#[tokio::test]
async fn ranking_keeps_same_id_of_other_kind() {
    let store = InMemoryRecordStore::from_records(fixtures());
    let results = rank(
        &store,
        &adapter(),
        EntityKind::Bill,
        "HB-101",
        &RankParams::default(),
    )
    .await
    .unwrap();
    assert!(results
        .iter()
        .any(|m| m.candidate.kind == EntityKind::LobbyFiling && m.candidate.id == "HB-101"));
    // All seven other records fit under the default limit.
    assert_eq!(results.len(), 7);
}

#[tokio::test]
async fn ranking_is_repeatable_under_concurrency() {
    let store = InMemoryRecordStore::from_records(fixtures());
    let adapter = adapter();
    let serial = RankParams {
        concurrency: 1,
        ..RankParams::default()
    };
    let parallel = RankParams {
        concurrency: 16,
        ..RankParams::default()
    };
    let a = rank(&store, &adapter, EntityKind::Bill, "HB-101", &serial)
        .await
        .unwrap();
    let b = rank(&store, &adapter, EntityKind::Bill, "HB-101", &parallel)
        .await
        .unwrap();
    let ids_a: Vec<String> = a.iter().map(|m| m.candidate.to_string()).collect();
    let ids_b: Vec<String> = b.iter().map(|m| m.candidate.to_string()).collect();
    assert_eq!(ids_a, ids_b);
    let scores_a: Vec<f64> = a.iter().map(|m| m.score).collect();
    let scores_b: Vec<f64> = b.iter().map(|m| m.score).collect();
    assert_eq!(scores_a, scores_b);
}

#[tokio::test]
async fn explanation_agrees_with_ranking_and_scorer() {
    let store = InMemoryRecordStore::from_records(fixtures());
    let adapter = adapter();
    let ranking = rank_with_stats(
        &store,
        &adapter,
        EntityKind::Bill,
        "HB-101",
        &RankParams::default(),
    )
    .await
    .unwrap();

    for m in &ranking.matches {
        let ex = explain(
            &store,
            &adapter,
            m.query.kind,
            &m.query.id,
            m.candidate.kind,
            &m.candidate.id,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(ex.score, m.score);
        assert_eq!(ex.features, m.features);
        assert_eq!(
            ex.statements.last().unwrap(),
            &format!("Match score {:.1}%", m.score * 100.0)
        );

        let a = store
            .find_record(m.query.kind, &m.query.id)
            .await
            .unwrap()
            .unwrap();
        let b = store
            .find_record(m.candidate.kind, &m.candidate.id)
            .await
            .unwrap()
            .unwrap();
        let (direct, _) = score(&adapter, &a, &b).await.unwrap();
        assert_eq!(direct, ex.score);
    }
}

#[tokio::test]
async fn bill_budget_scenario_contributions() {
    let store = InMemoryRecordStore::from_records(fixtures());
    let ex = explain(
        &store,
        &adapter(),
        EntityKind::Bill,
        "HB-101",
        EntityKind::BudgetLine,
        "B-EDU-25",
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(ex.shared_topics, vec!["education".to_string()]);
    assert_eq!(ex.features.topic_overlap, 1.0);
    assert_eq!(ex.features.geo_overlap(), Some(1.0));
    assert_eq!(ex.features.time_proximity_days, Some(70.0));

    let breakdown = score_bundle(&ex.features, &FeatureWeights::DEFAULT);
    assert!((breakdown.topics - 0.20).abs() < 1e-12);
    assert_eq!(breakdown.geography.map(|g| (g - 0.20).abs() < 1e-12), Some(true));
    let time = breakdown.time.unwrap();
    assert!((time - 0.15 * (1.0 - 70.0 / 365.0)).abs() < 1e-12);
    assert!((time - 0.121).abs() < 0.001);
    assert!(ex.score > 0.20 + 0.20 + time);
}

#[tokio::test]
async fn unknown_records_are_empty_not_errors() {
    let store = InMemoryRecordStore::from_records(fixtures());
    let adapter = adapter();
    let results = rank(
        &store,
        &adapter,
        EntityKind::Project,
        "HB-101",
        &RankParams::default(),
    )
    .await
    .unwrap();
    assert!(results.is_empty());

    let ex = explain(
        &store,
        &adapter,
        EntityKind::Bill,
        "NOPE",
        EntityKind::Bill,
        "HB-101",
    )
    .await
    .unwrap();
    assert!(ex.is_none());
}

#[tokio::test]
async fn degenerate_candidates_are_still_ranked() {
    let mut records = fixtures();
    records.push(Record::Bill(Bill {
        id: "HB-EMPTY".to_string(),
        title: String::new(),
        summary: None,
        subjects: vec![],
        reference_date: None,
    }));
    let store = InMemoryRecordStore::from_records(records);
    let results = rank(
        &store,
        &adapter(),
        EntityKind::BudgetLine,
        "B-EDU-25",
        &RankParams::with_limit(100),
    )
    .await
    .unwrap();

    let empty = results
        .iter()
        .find(|m| m.candidate.id == "HB-EMPTY")
        .expect("empty bill must still be ranked");
    assert_eq!(empty.features.embedding_similarity, 0.0);
    assert_eq!(empty.features.keyword_overlap, 0.0);
    // Bill state still resolves, so geography contributes.
    assert_eq!(empty.breakdown.geography, Some(0.20));
}
