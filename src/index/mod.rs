//! On-disk index format, loading and certification.
//!
//! # Layout
//! An index build is a directory (or static-file prefix) containing:
//! - `manifest.json`: model, dimensions, k, and one entry per cluster
//! - a centroids JSON file with one unit vector per cluster
//! - per non-empty cluster: a metadata JSON array and a flat `f32` embeddings
//!   file, parallel to each other

pub mod document;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod source;
pub mod validator;

pub use document::{DocumentMetadata, DocumentRecord, SourceFields};
pub use loader::{ClusterFailure, IndexLoader, LoadOutcome};
pub use manifest::{ClusterManifestEntry, Manifest, ManifestError, validate_manifest};
pub use model::{Centroid, CentroidRecord, Cluster, Index, Member};
pub use source::{FsSource, HttpSource, IndexSource, Location, SourceError, open_source};
pub use validator::{IndexValidator, ValidationReport, ValidationStats};
