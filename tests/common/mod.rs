#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use semdex::vector::{codec, normalized};

/// One cluster of a fixture index: centroid plus `(doc id, vector)` members.
#[derive(Debug, Clone)]
pub struct FixtureCluster {
    pub id: u32,
    pub centroid: Vec<f32>,
    pub docs: Vec<(String, Vec<f32>)>,
}

impl FixtureCluster {
    pub fn new(id: u32, centroid: &[f32]) -> Self {
        Self {
            id,
            centroid: normalized(centroid),
            docs: Vec::new(),
        }
    }

    pub fn doc(mut self, id: &str, vector: &[f32]) -> Self {
        self.docs.push((id.to_string(), normalized(vector)));
        self
    }
}

/// An index build written into a temporary directory.
///
/// Files: `manifest.json`, `centroids.json`, and per non-empty cluster
/// `cluster-{id}.json` / `cluster-{id}.emb`.
pub struct TestIndex {
    pub dir: TempDir,
}

impl TestIndex {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Writes a complete, valid index and returns it.
    pub fn build(dimensions: usize, clusters: &[FixtureCluster]) -> Self {
        let index = Self::new();
        index.write(dimensions, clusters);
        index
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> String {
        self.path().join("manifest.json").display().to_string()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn write(&self, dimensions: usize, clusters: &[FixtureCluster]) {
        let centroids: Vec<Value> = clusters
            .iter()
            .map(|c| json!({ "clusterId": c.id, "centroid": c.centroid }))
            .collect();
        self.write_json("centroids.json", &Value::Array(centroids));

        let mut entries = Vec::new();
        for cluster in clusters {
            if cluster.docs.is_empty() {
                entries.push(json!({ "clusterId": cluster.id, "count": 0 }));
                continue;
            }

            let metadata: Vec<Value> = cluster
                .docs
                .iter()
                .enumerate()
                .map(|(i, (id, _))| document(id, i))
                .collect();
            let vectors: Vec<&Vec<f32>> = cluster.docs.iter().map(|(_, v)| v).collect();

            let metadata_ref = format!("cluster-{}.json", cluster.id);
            let embeddings_ref = format!("cluster-{}.emb", cluster.id);
            self.write_json(&metadata_ref, &Value::Array(metadata));
            self.write_bytes(&embeddings_ref, &codec::encode(&vectors));

            entries.push(json!({
                "clusterId": cluster.id,
                "count": cluster.docs.len(),
                "embeddingsFileRef": embeddings_ref,
                "metadataFileRef": metadata_ref,
            }));
        }

        self.write_json(
            "manifest.json",
            &json!({
                "modelId": "test-model",
                "dimensions": dimensions,
                "k": clusters.len(),
                "clusterAlgorithmTag": "kmeans-test",
                "centroidsFileRef": "centroids.json",
                "clusters": entries,
            }),
        );
    }

    pub fn write_json(&self, name: &str, value: &Value) {
        self.write_bytes(
            name,
            &serde_json::to_vec_pretty(value).expect("Failed to serialize fixture"),
        );
    }

    pub fn write_bytes(&self, name: &str, bytes: &[u8]) {
        fs::write(self.file(name), bytes).expect("Failed to write fixture file");
    }

    pub fn read_json(&self, name: &str) -> Value {
        let bytes = fs::read(self.file(name)).expect("Failed to read fixture file");
        serde_json::from_slice(&bytes).expect("Fixture is not JSON")
    }

    /// Applies `edit` to the manifest on disk.
    pub fn edit_manifest(&self, edit: impl FnOnce(&mut Value)) {
        let mut manifest = self.read_json("manifest.json");
        edit(&mut manifest);
        self.write_json("manifest.json", &manifest);
    }

    /// Every file name with its contents, for serving over HTTP.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(self.path())
            .expect("Failed to list fixture dir")
            .map(|entry| {
                let entry = entry.expect("Failed to read dir entry");
                let name = entry.file_name().to_string_lossy().into_owned();
                let bytes = fs::read(entry.path()).expect("Failed to read fixture file");
                (name, bytes)
            })
            .collect();
        files.sort();
        files
    }
}

fn document(id: &str, position: usize) -> Value {
    let kind = if position % 2 == 0 { "school" } else { "district" };
    json!({
        "id": id,
        "text": format!("{id} text"),
        "metadata": {
            "kind": kind,
            "sourceId": format!("src-{id}"),
            "name": id,
            "locality": "Springfield",
        }
    })
}

/// The two-cluster, two-document index used by the end-to-end scenario.
pub fn alpha_beta() -> Vec<FixtureCluster> {
    vec![
        FixtureCluster::new(0, &[1.0, 0.0]).doc("alpha", &[1.0, 0.0]),
        FixtureCluster::new(1, &[0.0, 1.0]).doc("beta", &[0.0, 1.0]),
    ]
}

/// Seeded generator so fixture layouts are reproducible.
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn unit_vector(rng: &mut impl Rng, dimensions: usize) -> Vec<f32> {
    loop {
        let v: Vec<f32> = (0..dimensions).map(|_| rng.random_range(-1.0..1.0)).collect();
        if v.iter().map(|x| x * x).sum::<f32>() > 1e-3 {
            return normalized(&v);
        }
    }
}

/// A unit vector near `center`.
pub fn jitter(rng: &mut impl Rng, center: &[f32], amount: f32) -> Vec<f32> {
    let v: Vec<f32> = center
        .iter()
        .map(|c| c + rng.random_range(-amount..amount))
        .collect();
    normalized(&v)
}

/// `k` clusters of `per_cluster` documents scattered around random centroids.
pub fn synthetic_clusters(
    k: u32,
    per_cluster: usize,
    dimensions: usize,
    seed: u64,
) -> Vec<FixtureCluster> {
    let mut rng = seeded(seed);
    (0..k)
        .map(|id| {
            let centroid = unit_vector(&mut rng, dimensions);
            let mut cluster = FixtureCluster::new(id, &centroid);
            for n in 0..per_cluster {
                let v = jitter(&mut rng, &centroid, 0.6);
                cluster = cluster.doc(&format!("doc-{id}-{n}"), &v);
            }
            cluster
        })
        .collect()
}
