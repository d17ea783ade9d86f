//! Loading an index from disk and searching it end to end.

use std::sync::Arc;

use semdex::error::ClusterLoadError;
use semdex::vector::{ClusterId, check_numeric, normalized};
use semdex::{
    ClusteredSearchEngine, FsSource, IndexLoader, LoadError, SearchParams, exact_search,
};

use crate::common::{FixtureCluster, TestIndex, alpha_beta, synthetic_clusters};

fn loader() -> IndexLoader {
    IndexLoader::new(Arc::new(FsSource))
}

#[tokio::test]
async fn test_end_to_end_alpha_beta() {
    let fixture = TestIndex::build(2, &alpha_beta());
    let outcome = loader().load(&fixture.manifest_path()).await.unwrap();
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.index.document_count(), 2);

    let engine = ClusteredSearchEngine::new(Arc::new(outcome.index));
    let query = normalized(&[0.9, 0.1]);
    let results = engine
        .search(&query, &SearchParams::new(1, 1, 1).unwrap())
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "alpha text");
    assert_eq!(results[0].cluster_id, ClusterId::new(0));
    assert!((results[0].score.get() - 0.9939).abs() < 1e-3);
}

#[tokio::test]
async fn test_loaded_vectors_are_unit_length() {
    let fixture = TestIndex::build(8, &synthetic_clusters(4, 5, 8, 7));
    let outcome = loader().load(&fixture.manifest_path()).await.unwrap();

    for (_, member) in outcome.index.members() {
        assert!(check_numeric(member.vector.as_slice()).is_ok());
    }
    for centroid in outcome.index.centroids() {
        assert!(check_numeric(centroid.vector.as_slice()).is_ok());
    }
}

#[tokio::test]
async fn test_scanning_every_cluster_matches_exact_search() {
    let clusters = synthetic_clusters(6, 8, 16, 42);
    let fixture = TestIndex::build(16, &clusters);
    let outcome = loader().load(&fixture.manifest_path()).await.unwrap();
    let index = outcome.index;

    let params = SearchParams::new(6, 8, 10).unwrap();
    let mut rng = crate::common::seeded(99);
    for _ in 0..20 {
        let query = crate::common::unit_vector(&mut rng, 16);
        let clustered = semdex::search(&index, &query, &params).unwrap();
        let exact = exact_search(&index, &query, 10).unwrap();

        let clustered_ids: Vec<&str> = clustered.iter().map(|r| r.id.as_str()).collect();
        let exact_ids: Vec<&str> = exact.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(clustered_ids, exact_ids);
    }
}

#[tokio::test]
async fn test_repeated_loads_search_identically() {
    let fixture = TestIndex::build(8, &synthetic_clusters(5, 6, 8, 3));
    let first = loader().load(&fixture.manifest_path()).await.unwrap();
    let second = loader()
        .with_concurrency(1)
        .load(&fixture.manifest_path())
        .await
        .unwrap();

    let params = SearchParams::new(2, 3, 5).unwrap();
    let query = normalized(&[1.0, -0.5, 0.25, 0.0, 0.3, -0.2, 0.8, 0.1]);
    assert_eq!(
        semdex::search(&first.index, &query, &params).unwrap(),
        semdex::search(&second.index, &query, &params).unwrap()
    );
}

#[tokio::test]
async fn test_corrupt_cluster_is_dropped_and_search_continues() {
    let clusters = vec![
        FixtureCluster::new(0, &[1.0, 0.0, 0.0])
            .doc("a0", &[1.0, 0.1, 0.0])
            .doc("a1", &[1.0, 0.0, 0.1]),
        FixtureCluster::new(1, &[0.0, 1.0, 0.0]).doc("b0", &[0.1, 1.0, 0.0]),
        FixtureCluster::new(2, &[0.0, 0.0, 1.0]).doc("c0", &[0.0, 0.1, 1.0]),
    ];
    let fixture = TestIndex::build(3, &clusters);
    // Truncate cluster 1's embeddings by one float
    let bytes = std::fs::read(fixture.file("cluster-1.emb")).unwrap();
    fixture.write_bytes("cluster-1.emb", &bytes[..bytes.len() - 4]);
    // And corrupt cluster 2's metadata
    fixture.write_bytes("cluster-2.json", b"[{\"id\": ");

    let outcome = loader().load(&fixture.manifest_path()).await.unwrap();
    assert!(outcome.is_degraded());
    assert_eq!(outcome.cluster_errors.len(), 2);

    let failed: Vec<u32> = outcome
        .cluster_errors
        .iter()
        .map(|f| f.cluster_id.get())
        .collect();
    assert_eq!(failed, vec![1, 2]);
    assert!(matches!(
        outcome.cluster_errors[0].error,
        ClusterLoadError::EmbeddingsSizeMismatch(_)
    ));
    assert!(matches!(
        outcome.cluster_errors[1].error,
        ClusterLoadError::MetadataParse(_)
    ));

    assert!(outcome.index.cluster(ClusterId::new(1)).is_none());
    assert_eq!(outcome.index.document_count(), 2);

    // Queries aimed at the dropped clusters still succeed
    let params = SearchParams::new(1, 5, 5).unwrap();
    let missing = semdex::search(&outcome.index, &normalized(&[0.0, 1.0, 0.0]), &params).unwrap();
    assert!(missing.is_empty());

    let params = SearchParams::new(3, 5, 5).unwrap();
    let all = semdex::search(&outcome.index, &normalized(&[0.5, 0.5, 0.5]), &params).unwrap();
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"a0") && ids.contains(&"a1"));
}

#[tokio::test]
async fn test_empty_cluster_loads_without_files() {
    let clusters = vec![
        FixtureCluster::new(0, &[1.0, 0.0]).doc("only", &[1.0, 0.0]),
        FixtureCluster::new(1, &[0.0, 1.0]),
    ];
    let fixture = TestIndex::build(2, &clusters);
    let outcome = loader().load(&fixture.manifest_path()).await.unwrap();

    assert!(!outcome.is_degraded());
    let empty = outcome.index.cluster(ClusterId::new(1)).unwrap();
    assert!(empty.is_empty());

    let params = SearchParams::new(1, 5, 5).unwrap();
    assert!(
        semdex::search(&outcome.index, &[0.0, 1.0], &params)
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_broken_centroids_fail_the_whole_load() {
    let fixture = TestIndex::build(2, &alpha_beta());
    fixture.write_bytes("centroids.json", b"{ not json");

    let err = loader().load(&fixture.manifest_path()).await.unwrap_err();
    assert!(matches!(err, LoadError::CentroidParse { .. }));
    assert_eq!(err.status_code(), "CENTROID_PARSE_ERROR");
}

#[tokio::test]
async fn test_repeated_centroid_id_fails_the_whole_load() {
    let fixture = TestIndex::build(2, &alpha_beta());
    fixture.write_json(
        "centroids.json",
        &serde_json::json!([
            { "clusterId": 0, "centroid": [1.0, 0.0] },
            { "clusterId": 0, "centroid": [0.0, 1.0] }
        ]),
    );

    let err = loader().load(&fixture.manifest_path()).await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::DuplicateCentroid { cluster_id } if cluster_id == ClusterId::new(0)
    ));
    assert_eq!(err.status_code(), "DUPLICATE_CENTROID");
}

#[tokio::test]
async fn test_invalid_manifest_is_rejected_before_any_cluster_fetch() {
    let fixture = TestIndex::build(2, &alpha_beta());
    fixture.edit_manifest(|m| {
        m["k"] = serde_json::json!(5);
    });
    // Cluster files going missing must not matter: the manifest fails first
    std::fs::remove_file(fixture.file("cluster-0.emb")).unwrap();

    let err = loader().load(&fixture.manifest_path()).await.unwrap_err();
    assert!(matches!(err, LoadError::ManifestInvalid(_)));
}
