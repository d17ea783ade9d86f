//! Offline certification of an index build.
//!
//! The validator re-reads every artifact independently of the loader and
//! records each problem it finds instead of stopping at the first one, so
//! a single run produces a full defect inventory. Every vector is checked,
//! not a sample: a bad vector never errors at query time, it just quietly
//! returns worse results.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ErrorCategory;
use crate::index::document::DocumentRecord;
use crate::index::manifest::{ClusterManifestEntry, Manifest};
use crate::index::model::CentroidRecord;
use crate::index::source::{IndexSource, Location};
use crate::vector::{
    ClusterId, CodecError, NORM_TOLERANCE, VectorDimension, VectorError, check_numeric, codec,
};

/// Counters describing how much of the index was inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub clusters_checked: usize,
    pub centroids_checked: usize,
    pub vectors_checked: usize,
    pub documents_checked: usize,
    /// Centroids and vectors that failed the finite or unit-norm check
    pub numeric_failures: usize,
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// True exactly when `errors` is empty
    pub passed: bool,
    /// Every problem found, in discovery order
    pub errors: Vec<String>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    fn finish(errors: Vec<String>, stats: ValidationStats) -> Self {
        Self {
            passed: errors.is_empty(),
            errors,
            stats,
        }
    }
}

/// Accumulates errors and counters while walking the artifacts.
#[derive(Debug, Default)]
struct Checker {
    errors: Vec<String>,
    stats: ValidationStats,
    /// Document id -> clusters containing it
    document_ids: BTreeMap<String, Vec<ClusterId>>,
}

impl Checker {
    fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("validation error: {}", message);
        self.errors.push(message);
    }

    fn numeric_error(&mut self, context: String, err: &VectorError) {
        if err.category() == ErrorCategory::Numeric {
            self.stats.numeric_failures += 1;
        }
        self.error(format!("{context}: {}", describe_numeric(err)));
    }

    fn check_manifest(&mut self, manifest: &Manifest) {
        for violation in manifest.violations() {
            self.error(format!("manifest: {violation}"));
        }
    }

    fn check_centroids(
        &mut self,
        manifest: &Manifest,
        dimension: VectorDimension,
        records: &[CentroidRecord],
    ) {
        if records.len() != manifest.k {
            self.error(format!(
                "centroids: file has {} entries, expected k = {}",
                records.len(),
                manifest.k
            ));
        }

        let declared: HashSet<ClusterId> =
            manifest.clusters.iter().map(|c| c.cluster_id).collect();
        let mut seen = HashSet::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            let id = record.cluster_id;
            self.stats.centroids_checked += 1;

            if !seen.insert(id) {
                self.error(format!("centroids[{position}]: duplicate cluster id {id}"));
            }
            if !declared.contains(&id) {
                self.error(format!(
                    "centroids[{position}]: cluster id {id} is not declared in the manifest"
                ));
            }
            if record.centroid.len() != dimension.get() {
                self.error(format!(
                    "centroids[{position}] (cluster {id}): has {} components, expected {}",
                    record.centroid.len(),
                    dimension
                ));
                continue;
            }
            if let Err(e) = check_numeric(&record.centroid) {
                self.numeric_error(format!("centroids[{position}] (cluster {id})"), &e);
            }
        }
    }

    fn check_metadata(&mut self, entry: &ClusterManifestEntry, bytes: &[u8]) {
        let id = entry.cluster_id;
        let records: Vec<Value> = match serde_json::from_slice(bytes) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                self.error(format!("cluster {id}: metadata file is not a JSON array"));
                return;
            }
            Err(e) => {
                self.error(format!("cluster {id}: metadata file is not valid JSON: {e}"));
                return;
            }
        };

        if records.len() != entry.count {
            self.error(format!(
                "cluster {id}: metadata has {} records, expected count {}",
                records.len(),
                entry.count
            ));
        }

        if let Some(first) = records.first() {
            for field in ["/id", "/text", "/metadata/sourceId"] {
                if !is_non_empty_string(first.pointer(field)) {
                    self.error(format!(
                        "cluster {id}: first metadata record is missing a non-empty '{}'",
                        &field[1..].replace('/', ".")
                    ));
                }
            }
        }

        // Anything the loader would refuse, e.g. an unknown kind or a missing name.
        if let Err(e) = serde_json::from_slice::<Vec<DocumentRecord>>(bytes) {
            self.error(format!(
                "cluster {id}: metadata records do not match the document schema: {e}"
            ));
        }

        for record in &records {
            if let Some(doc_id) = record.get("id").and_then(Value::as_str) {
                self.document_ids
                    .entry(doc_id.to_string())
                    .or_default()
                    .push(id);
            }
        }
        self.stats.documents_checked += records.len();
    }

    fn check_embeddings(
        &mut self,
        entry: &ClusterManifestEntry,
        dimension: VectorDimension,
        bytes: &[u8],
    ) {
        let id = entry.cluster_id;
        let rows = match codec::decode_rows(bytes, entry.count, dimension) {
            Ok(rows) => rows,
            Err(CodecError::SizeMismatch {
                expected, actual, ..
            }) => {
                self.error(format!(
                    "cluster {id}: embeddings file is {actual} bytes, expected {expected} ({} x {} x 4)",
                    entry.count, dimension
                ));
                return;
            }
            Err(e @ CodecError::SizeOverflow { .. }) => {
                self.error(format!("cluster {id}: {e}"));
                return;
            }
        };

        for (position, row) in rows.iter().enumerate() {
            self.stats.vectors_checked += 1;
            if let Err(e) = check_numeric(row) {
                self.numeric_error(format!("cluster {id}: vector {position}"), &e);
            }
        }
    }

    fn check_document_ids(&mut self) {
        let duplicates: Vec<(String, Vec<ClusterId>)> = self
            .document_ids
            .iter()
            .filter(|(_, clusters)| clusters.len() > 1)
            .map(|(doc_id, clusters)| (doc_id.clone(), clusters.clone()))
            .collect();
        for (doc_id, clusters) in duplicates {
            let list: Vec<String> = clusters.iter().map(ToString::to_string).collect();
            self.error(format!(
                "document id '{doc_id}' appears {} times (clusters {})",
                clusters.len(),
                list.join(", ")
            ));
        }
    }
}

fn is_non_empty_string(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn describe_numeric(err: &VectorError) -> String {
    match err {
        VectorError::NonFinite { index, value } => {
            format!("non-finite component {value} at position {index}")
        }
        VectorError::NotNormalized { norm } => {
            format!("L2 norm {norm} is not within {NORM_TOLERANCE} of 1.0")
        }
        other => other.to_string(),
    }
}

/// Read-only certification pass over an index on disk or behind HTTP.
#[derive(Debug, Clone)]
pub struct IndexValidator {
    source: Arc<dyn IndexSource>,
}

impl IndexValidator {
    #[must_use]
    pub fn new(source: Arc<dyn IndexSource>) -> Self {
        Self { source }
    }

    /// Validates the index whose manifest lives at `manifest`.
    ///
    /// Never fails: unreadable artifacts become report errors.
    pub async fn validate(&self, manifest: &str) -> ValidationReport {
        let mut checker = Checker::default();
        self.run(manifest, &mut checker).await;

        let report = ValidationReport::finish(checker.errors, checker.stats);
        if report.passed {
            info!(
                "Index certified: {} clusters, {} vectors checked",
                report.stats.clusters_checked, report.stats.vectors_checked
            );
        } else {
            warn!("Index validation failed with {} errors", report.errors.len());
        }
        report
    }

    async fn run(&self, manifest: &str, checker: &mut Checker) {
        let manifest_location = match Location::parse(manifest) {
            Ok(location) => location,
            Err(e) => {
                checker.error(format!("manifest: {e}"));
                return;
            }
        };

        let manifest = match self.source.fetch(&manifest_location).await {
            Ok(bytes) => match Manifest::from_slice(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    checker.error(format!("manifest: failed to parse: {e}"));
                    return;
                }
            },
            Err(e) => {
                checker.error(format!("manifest: {e}"));
                return;
            }
        };

        checker.check_manifest(&manifest);

        // Sizes and norms cannot be checked without a dimension.
        let Ok(dimension) = manifest.dimension() else {
            return;
        };

        if let Some(bytes) = self
            .fetch_ref(checker, &manifest_location, &manifest.centroids_file_ref, "centroids")
            .await
        {
            match serde_json::from_slice::<Vec<CentroidRecord>>(&bytes) {
                Ok(records) => checker.check_centroids(&manifest, dimension, &records),
                Err(e) => checker.error(format!("centroids: failed to parse: {e}")),
            }
        }

        for entry in &manifest.clusters {
            checker.stats.clusters_checked += 1;
            if entry.is_empty() {
                continue;
            }
            // Missing refs were already reported by the manifest checks.
            let Some((embeddings_ref, metadata_ref)) = entry.file_refs() else {
                continue;
            };
            let label = format!("cluster {}", entry.cluster_id);

            if let Some(bytes) = self
                .fetch_ref(checker, &manifest_location, metadata_ref, &label)
                .await
            {
                checker.check_metadata(entry, &bytes);
            }
            if let Some(bytes) = self
                .fetch_ref(checker, &manifest_location, embeddings_ref, &label)
                .await
            {
                checker.check_embeddings(entry, dimension, &bytes);
            }
        }

        checker.check_document_ids();
    }

    async fn fetch_ref(
        &self,
        checker: &mut Checker,
        base: &Location,
        reference: &str,
        label: &str,
    ) -> Option<Vec<u8>> {
        let location = match base.resolve(reference) {
            Ok(location) => location,
            Err(e) => {
                checker.error(format!("{label}: {e}"));
                return None;
            }
        };
        match self.source.fetch(&location).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                checker.error(format!("{label}: {e}"));
                None
            }
        }
    }
}

/// Groups validation errors by the prefix before the first ':'.
///
/// Used by the CLI to print a compact summary.
#[must_use]
pub fn summarize_errors(errors: &[String]) -> HashMap<String, usize> {
    let mut summary = HashMap::new();
    for error in errors {
        let key = error.split(':').next().unwrap_or(error).to_string();
        *summary.entry(key).or_insert(0) += 1;
    }
    summary
}
