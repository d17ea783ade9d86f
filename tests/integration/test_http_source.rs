//! Loading and validating an index served over HTTP.

use std::sync::Arc;
use std::time::Duration;

use semdex::config::FetchConfig;
use semdex::error::ClusterLoadError;
use semdex::index::SourceError;
use semdex::vector::{ClusterId, normalized};
use semdex::{HttpSource, IndexLoader, IndexValidator, LoadError, SearchParams, open_source};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{TestIndex, alpha_beta, synthetic_clusters};

/// Serves every fixture file under `/idx/`, skipping `omit`.
async fn serve(fixture: &TestIndex, omit: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    for (name, bytes) in fixture.files() {
        if omit.contains(&name.as_str()) {
            continue;
        }
        Mock::given(method("GET"))
            .and(path(format!("/idx/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
            .mount(&server)
            .await;
    }
    server
}

fn manifest_url(server: &MockServer) -> String {
    format!("{}/idx/manifest.json", server.uri())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_and_search_over_http() {
    let fixture = TestIndex::build(2, &alpha_beta());
    let server = serve(&fixture, &[]).await;

    let loader = IndexLoader::from_config(
        open_source(&FetchConfig::default()),
        &FetchConfig::default(),
    );
    let outcome = loader.load(&manifest_url(&server)).await.unwrap();
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.index.model_id(), "test-model");

    let results = semdex::search(
        &outcome.index,
        &normalized(&[0.1, 0.9]),
        &SearchParams::new(1, 1, 1).unwrap(),
    )
    .unwrap();
    assert_eq!(results[0].id, "beta");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_cluster_file_degrades_load() {
    let fixture = TestIndex::build(8, &synthetic_clusters(3, 4, 8, 5));
    let server = serve(&fixture, &["cluster-2.emb"]).await;

    let loader = IndexLoader::new(Arc::new(HttpSource::default()));
    let outcome = loader.load(&manifest_url(&server)).await.unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(outcome.cluster_errors.len(), 1);
    let failure = &outcome.cluster_errors[0];
    assert_eq!(failure.cluster_id, ClusterId::new(2));
    assert!(matches!(
        failure.error,
        ClusterLoadError::Source(SourceError::Status { status: 404, .. })
    ));
    assert_eq!(outcome.index.document_count(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_manifest_is_fatal() {
    let fixture = TestIndex::build(2, &alpha_beta());
    let server = serve(&fixture, &["manifest.json"]).await;

    let loader = IndexLoader::new(Arc::new(HttpSource::default()));
    let err = loader.load(&manifest_url(&server)).await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Source(SourceError::Status { status: 404, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_body_limit_is_enforced() {
    let fixture = TestIndex::build(2, &alpha_beta());
    let server = serve(&fixture, &[]).await;

    // Smaller than the manifest itself
    let source = HttpSource::new(Duration::from_secs(5), 64);
    let err = IndexLoader::new(Arc::new(source))
        .load(&manifest_url(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Source(SourceError::Http { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_validator_over_http() {
    let fixture = TestIndex::build(8, &synthetic_clusters(3, 4, 8, 21));
    let server = serve(&fixture, &[]).await;

    let validator = IndexValidator::new(open_source(&FetchConfig::default()));
    let report = validator.validate(&manifest_url(&server)).await;
    assert!(report.passed, "unexpected errors: {:?}", report.errors);
    assert_eq!(report.stats.vectors_checked, 12);

    let server = serve(&fixture, &["cluster-0.json"]).await;
    let report = validator.validate(&manifest_url(&server)).await;
    assert!(!report.passed);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("cluster 0:"));
}
