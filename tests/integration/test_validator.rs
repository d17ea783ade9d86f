//! Certification of index builds on disk.

use std::sync::Arc;

use semdex::index::validator::summarize_errors;
use semdex::vector::codec;
use semdex::{FsSource, IndexValidator};

use crate::common::{FixtureCluster, TestIndex, alpha_beta, synthetic_clusters};

fn validator() -> IndexValidator {
    IndexValidator::new(Arc::new(FsSource))
}

#[tokio::test]
async fn test_valid_index_passes_with_full_stats() {
    let fixture = TestIndex::build(8, &synthetic_clusters(4, 5, 8, 11));
    let report = validator().validate(&fixture.manifest_path()).await;

    assert!(report.passed, "unexpected errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert_eq!(report.stats.clusters_checked, 4);
    assert_eq!(report.stats.centroids_checked, 4);
    assert_eq!(report.stats.vectors_checked, 20);
    assert_eq!(report.stats.documents_checked, 20);
}

#[tokio::test]
async fn test_reports_every_defect_in_one_pass() {
    let clusters = vec![
        FixtureCluster::new(0, &[1.0, 0.0]).doc("a", &[1.0, 0.0]),
        FixtureCluster::new(1, &[0.0, 1.0])
            .doc("b", &[0.0, 1.0])
            .doc("c", &[0.1, 1.0]),
        FixtureCluster::new(2, &[1.0, 1.0]).doc("d", &[1.0, 1.0]),
    ];
    let fixture = TestIndex::build(2, &clusters);

    // cluster 0: a vector that is far from unit length
    fixture.write_bytes("cluster-0.emb", &codec::encode(&[vec![2.0_f32, 0.0]]));
    // cluster 1: a non-finite component
    fixture.write_bytes(
        "cluster-1.emb",
        &codec::encode(&[vec![0.0_f32, 1.0], vec![f32::NAN, 0.0]]),
    );
    // cluster 2: metadata file is gone
    std::fs::remove_file(fixture.file("cluster-2.json")).unwrap();

    let report = validator().validate(&fixture.manifest_path()).await;
    assert!(!report.passed);
    assert_eq!(report.errors.len(), 3, "errors: {:?}", report.errors);

    assert!(report.errors[0].starts_with("cluster 0: vector 0: L2 norm"));
    assert!(report.errors[1].starts_with("cluster 1: vector 1: non-finite component"));
    assert!(report.errors[2].starts_with("cluster 2:"));
    // Every vector that could be read was still inspected
    assert_eq!(report.stats.vectors_checked, 4);
    assert_eq!(report.stats.numeric_failures, 2);

    let summary = summarize_errors(&report.errors);
    assert_eq!(summary.get("cluster 0"), Some(&1));
    assert_eq!(summary.get("cluster 2"), Some(&1));
}

#[tokio::test]
async fn test_count_mismatch_and_duplicate_ids() {
    let clusters = vec![
        FixtureCluster::new(0, &[1.0, 0.0]).doc("shared", &[1.0, 0.0]),
        FixtureCluster::new(1, &[0.0, 1.0]).doc("shared", &[0.0, 1.0]),
    ];
    let fixture = TestIndex::build(2, &clusters);
    fixture.edit_manifest(|m| {
        m["clusters"][1]["count"] = serde_json::json!(2);
    });

    let report = validator().validate(&fixture.manifest_path()).await;
    assert!(!report.passed);

    let has = |needle: &str| report.errors.iter().any(|e| e.contains(needle));
    assert!(has("cluster 1: metadata has 1 records, expected count 2"));
    assert!(has("cluster 1: embeddings file is 8 bytes, expected 16"));
    assert!(has("document id 'shared' appears 2 times (clusters 0, 1)"));
}

#[tokio::test]
async fn test_manifest_and_centroid_defects() {
    let fixture = TestIndex::build(2, &alpha_beta());
    fixture.edit_manifest(|m| {
        m["clusters"][1]["clusterId"] = serde_json::json!(0);
    });
    fixture.write_json(
        "centroids.json",
        &serde_json::json!([
            { "clusterId": 0, "centroid": [1.0, 0.0] },
            { "clusterId": 9, "centroid": [0.0, 1.0, 0.0] }
        ]),
    );

    let report = validator().validate(&fixture.manifest_path()).await;
    assert!(!report.passed);

    let has = |needle: &str| report.errors.iter().any(|e| e.contains(needle));
    assert!(report.errors.iter().any(|e| e.starts_with("manifest:")));
    assert!(has("centroids[1]: cluster id 9 is not declared in the manifest"));
    assert!(has("centroids[1] (cluster 9): has 3 components, expected 2"));
}

#[tokio::test]
async fn test_unreadable_manifest_is_a_single_error() {
    let fixture = TestIndex::new();
    let report = validator().validate(&fixture.manifest_path()).await;

    assert!(!report.passed);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("manifest:"));
    assert_eq!(report.stats.clusters_checked, 0);
}

#[tokio::test]
async fn test_impossible_declared_count_does_not_panic() {
    let fixture = TestIndex::build(2, &alpha_beta());
    fixture.edit_manifest(|m| {
        m["clusters"][0]["count"] = serde_json::json!(u64::MAX / 2);
    });

    let report = validator().validate(&fixture.manifest_path()).await;
    assert!(!report.passed);

    let has = |needle: &str| report.errors.iter().any(|e| e.contains(needle));
    assert!(has("cluster 0: metadata has 1 records"));
    assert!(has("cluster 0: Embeddings buffer for"));
    // The healthy cluster is still certified
    assert!(!has("cluster 1:"));
}

#[tokio::test]
async fn test_impossible_dimension_is_a_manifest_error() {
    let fixture = TestIndex::build(2, &alpha_beta());
    fixture.edit_manifest(|m| {
        m["dimensions"] = serde_json::json!(u64::MAX / 2);
    });

    let report = validator().validate(&fixture.manifest_path()).await;
    assert!(!report.passed);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert!(report.errors[0].starts_with("manifest: manifest.dimensions"));
    assert!(report.errors[0].contains("too large"));
}

#[tokio::test]
async fn test_unloadable_metadata_record_fails_certification() {
    let clusters = vec![
        FixtureCluster::new(0, &[1.0, 0.0])
            .doc("a", &[1.0, 0.0])
            .doc("b", &[1.0, 0.1])
            .doc("c", &[1.0, 0.2]),
    ];
    let fixture = TestIndex::build(2, &clusters);
    let mut records = fixture.read_json("cluster-0.json");
    records[2]["metadata"]["kind"] = serde_json::json!("county");
    fixture.write_json("cluster-0.json", &records);

    let report = validator().validate(&fixture.manifest_path()).await;
    assert!(!report.passed);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert!(report.errors[0].contains("do not match the document schema"));
}
