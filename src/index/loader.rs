//! Index loader: manifest + centroids + per-cluster files into an [`Index`].
//!
//! # Load sequence
//! 1. Fetch, parse and structurally validate the manifest (fatal on failure).
//! 2. Spawn one task per non-empty cluster; each fetches its metadata and
//!    embeddings files concurrently and decodes them.
//! 3. While those run, fetch and check the centroids file (fatal on failure,
//!    which also aborts the in-flight cluster tasks).
//! 4. Join every cluster task. A failed cluster is logged, reported in
//!    [`LoadOutcome::cluster_errors`] and left out of the index.
//!
//! Only structural checks happen here. Numeric certification of vectors is
//! the validator's job.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{ClusterLoadError, LoadError};
use crate::index::document::DocumentRecord;
use crate::index::manifest::{ClusterManifestEntry, Manifest};
use crate::index::model::{Centroid, CentroidRecord, Cluster, Index, Member};
use crate::index::source::{IndexSource, Location};
use crate::vector::{ClusterId, EmbeddingVector, VectorDimension, check_numeric, codec};

/// Default number of clusters fetched at the same time.
pub const DEFAULT_MAX_CONCURRENT_CLUSTERS: usize = 16;

/// A cluster that could not be loaded.
#[derive(Debug)]
pub struct ClusterFailure {
    pub cluster_id: ClusterId,
    pub error: ClusterLoadError,
}

/// Result of a successful load.
///
/// The index may be degraded: clusters listed in `cluster_errors` are
/// missing from it and searches simply cannot reach their documents.
#[derive(Debug)]
pub struct LoadOutcome {
    pub manifest: Manifest,
    pub index: Index,
    /// Sorted by cluster id
    pub cluster_errors: Vec<ClusterFailure>,
}

impl LoadOutcome {
    /// True when at least one non-empty cluster was dropped.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.cluster_errors.is_empty()
    }
}

/// Per-task result: members of one cluster or the reason it was dropped.
type ClusterLoadResult = (ClusterId, Result<Vec<Member>, ClusterLoadError>);

/// Loads index snapshots from an [`IndexSource`].
#[derive(Debug, Clone)]
pub struct IndexLoader {
    source: Arc<dyn IndexSource>,
    max_concurrency: usize,
}

impl IndexLoader {
    #[must_use]
    pub fn new(source: Arc<dyn IndexSource>) -> Self {
        Self {
            source,
            max_concurrency: DEFAULT_MAX_CONCURRENT_CLUSTERS,
        }
    }

    /// Builds a loader using the fetch settings' concurrency bound.
    #[must_use]
    pub fn from_config(source: Arc<dyn IndexSource>, config: &FetchConfig) -> Self {
        Self::new(source).with_concurrency(config.max_concurrent_clusters)
    }

    /// Caps the number of clusters fetched concurrently (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Loads the index described by the manifest at `manifest`.
    pub async fn load(&self, manifest: &str) -> Result<LoadOutcome, LoadError> {
        self.load_with_cancellation(manifest, CancellationToken::new())
            .await
    }

    /// Loads the index, abandoning everything if `ct` is cancelled first.
    ///
    /// Cancellation drops the in-flight work, which aborts every spawned
    /// cluster task; no partial index is ever returned.
    pub async fn load_with_cancellation(
        &self,
        manifest: &str,
        ct: CancellationToken,
    ) -> Result<LoadOutcome, LoadError> {
        let location = Location::parse(manifest)?;

        tokio::select! {
            biased;
            _ = ct.cancelled() => {
                info!("Index load cancelled: {}", location);
                Err(LoadError::Cancelled)
            }
            result = self.load_from(location.clone()) => result,
        }
    }

    async fn load_from(&self, manifest_location: Location) -> Result<LoadOutcome, LoadError> {
        info!("Loading index manifest from {}", manifest_location);

        let manifest = self.fetch_manifest(&manifest_location).await?;
        let dimension = manifest.dimension()?;

        let (mut tasks, pending) = self.spawn_cluster_loads(&manifest, &manifest_location, dimension);

        let centroids = self
            .fetch_centroids(&manifest, &manifest_location, dimension)
            .await?;

        let mut results: Vec<ClusterLoadResult> = Vec::with_capacity(pending.len());
        let mut outstanding = pending;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((cluster_id, result)) => {
                    outstanding.remove(&cluster_id);
                    results.push((cluster_id, result));
                }
                Err(e) => warn!("Cluster load task failed to complete: {}", e),
            }
        }
        // Any id still outstanding belongs to a task that panicked.
        for cluster_id in outstanding {
            results.push((
                cluster_id,
                Err(ClusterLoadError::Task("load task panicked".to_string())),
            ));
        }

        let (index, cluster_errors) = assemble(&manifest, dimension, centroids, results);

        for failure in &cluster_errors {
            warn!(
                cluster_id = failure.cluster_id.get(),
                status = failure.error.status_code(),
                "Dropping cluster {}: {}",
                failure.cluster_id,
                failure.error
            );
        }
        info!(
            "Loaded index '{}': {} of {} clusters, {} documents",
            manifest.model_id,
            index.clusters().len(),
            manifest.k,
            index.document_count()
        );

        Ok(LoadOutcome {
            manifest,
            index,
            cluster_errors,
        })
    }

    async fn fetch_manifest(&self, location: &Location) -> Result<Manifest, LoadError> {
        let bytes = self.source.fetch(location).await?;
        let manifest = Manifest::from_slice(&bytes).map_err(|source| LoadError::ManifestParse {
            location: location.to_string(),
            source,
        })?;
        manifest.validate()?;
        debug!(
            "Manifest ok: model={} dims={} k={} algorithm={}",
            manifest.model_id, manifest.dimensions, manifest.k, manifest.cluster_algorithm_tag
        );
        Ok(manifest)
    }

    async fn fetch_centroids(
        &self,
        manifest: &Manifest,
        manifest_location: &Location,
        dimension: VectorDimension,
    ) -> Result<Vec<Centroid>, LoadError> {
        let location = manifest_location.resolve(&manifest.centroids_file_ref)?;
        let bytes = self.source.fetch(&location).await?;
        let records: Vec<CentroidRecord> =
            serde_json::from_slice(&bytes).map_err(|source| LoadError::CentroidParse {
                location: location.to_string(),
                source,
            })?;
        parse_centroids(records, manifest, dimension)
    }

    fn spawn_cluster_loads(
        &self,
        manifest: &Manifest,
        manifest_location: &Location,
        dimension: VectorDimension,
    ) -> (JoinSet<ClusterLoadResult>, HashSet<ClusterId>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut pending = HashSet::new();

        for entry in manifest.clusters.iter().filter(|e| !e.is_empty()) {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let entry = entry.clone();
            let base = manifest_location.clone();
            pending.insert(entry.cluster_id);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        load_cluster_members(source.as_ref(), &base, &entry, dimension).await
                    }
                    Err(e) => Err(ClusterLoadError::Task(e.to_string())),
                };
                (entry.cluster_id, result)
            });
        }

        (tasks, pending)
    }
}

/// Converts parsed centroid records, enforcing count and dimension.
/// Checks the centroids file against the manifest.
///
/// On success there is exactly one centroid per declared cluster.
fn parse_centroids(
    records: Vec<CentroidRecord>,
    manifest: &Manifest,
    dimension: VectorDimension,
) -> Result<Vec<Centroid>, LoadError> {
    if records.len() != manifest.k {
        return Err(LoadError::CentroidCountMismatch {
            expected: manifest.k,
            actual: records.len(),
        });
    }

    let declared: HashSet<ClusterId> = manifest.clusters.iter().map(|c| c.cluster_id).collect();
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .map(|record| {
            let cluster_id = record.cluster_id;
            if !seen.insert(cluster_id) {
                return Err(LoadError::DuplicateCentroid { cluster_id });
            }
            if !declared.contains(&cluster_id) {
                return Err(LoadError::UndeclaredCentroid { cluster_id });
            }
            if record.centroid.len() != dimension.get() {
                return Err(LoadError::CentroidDimensionMismatch {
                    cluster_id,
                    expected: dimension.get(),
                    actual: record.centroid.len(),
                });
            }
            check_numeric(&record.centroid)
                .map_err(|source| LoadError::CentroidNumeric { cluster_id, source })?;
            Ok(Centroid {
                cluster_id,
                vector: EmbeddingVector::from_components(record.centroid),
            })
        })
        .collect()
}

/// Fetches and decodes one cluster's parallel metadata/embeddings files.
async fn load_cluster_members(
    source: &dyn IndexSource,
    base: &Location,
    entry: &ClusterManifestEntry,
    dimension: VectorDimension,
) -> Result<Vec<Member>, ClusterLoadError> {
    // The manifest was validated, so a non-empty entry always has both refs.
    let (embeddings_ref, metadata_ref) = entry.file_refs().ok_or_else(|| {
        ClusterLoadError::Task("non-empty cluster without file references".to_string())
    })?;
    let metadata_location = base.resolve(metadata_ref)?;
    let embeddings_location = base.resolve(embeddings_ref)?;

    let (metadata_bytes, embeddings_bytes) = tokio::join!(
        source.fetch(&metadata_location),
        source.fetch(&embeddings_location)
    );

    let records: Vec<DocumentRecord> =
        serde_json::from_slice(&metadata_bytes?).map_err(ClusterLoadError::MetadataParse)?;
    if records.len() != entry.count {
        return Err(ClusterLoadError::MetadataCountMismatch {
            expected: entry.count,
            actual: records.len(),
        });
    }

    let vectors = codec::decode(&embeddings_bytes?, entry.count, dimension)?;

    debug!(
        "Decoded cluster {}: {} members",
        entry.cluster_id,
        records.len()
    );

    Ok(records
        .into_iter()
        .zip(vectors)
        .map(|(record, vector)| Member { record, vector })
        .collect())
}

/// Partitions task results into the final cluster map plus failures.
fn assemble(
    manifest: &Manifest,
    dimension: VectorDimension,
    centroids: Vec<Centroid>,
    results: Vec<ClusterLoadResult>,
) -> (Index, Vec<ClusterFailure>) {
    let centroid_by_id: HashMap<ClusterId, &EmbeddingVector> = centroids
        .iter()
        .map(|c| (c.cluster_id, &c.vector))
        .collect();

    let mut loaded: HashMap<ClusterId, Vec<Member>> = HashMap::with_capacity(results.len());
    let mut failures: BTreeMap<ClusterId, ClusterLoadError> = BTreeMap::new();
    for (cluster_id, result) in results {
        match result {
            Ok(members) => {
                loaded.insert(cluster_id, members);
            }
            Err(error) => {
                failures.insert(cluster_id, error);
            }
        }
    }

    let mut clusters = Vec::with_capacity(manifest.clusters.len());
    for entry in &manifest.clusters {
        let id = entry.cluster_id;
        if failures.contains_key(&id) {
            continue;
        }
        // Guaranteed present by parse_centroids.
        let Some(centroid) = centroid_by_id.get(&id) else {
            continue;
        };
        let members = if entry.is_empty() {
            Vec::new()
        } else {
            loaded.remove(&id).unwrap_or_default()
        };
        clusters.push(Cluster::new(id, (*centroid).clone(), members));
    }

    let index = Index::new(manifest.model_id.clone(), dimension, centroids, clusters);
    let failures = failures
        .into_iter()
        .map(|(cluster_id, error)| ClusterFailure { cluster_id, error })
        .collect();

    (index, failures)
}
