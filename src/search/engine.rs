//! Clustered (IVF-flat) similarity search.
//!
//! # Algorithm
//! 1. Coarse: score the query against every centroid and keep the best
//!    `top_m_clusters`, ties broken by lower cluster id.
//! 2. Fine: exact scan of each selected cluster, keeping its best
//!    `top_k_per_cluster` members, ties broken by insertion order.
//! 3. Merge: stable sort of all candidates by score, truncated to
//!    `final_top_n`.
//!
//! Only step 1 is approximate. With `top_m_clusters >= k` the result is the
//! exact top-N over every loaded document.
//!
//! Scores are plain dot products. Both sides are expected to be unit length,
//! so this is cosine similarity; the query is not re-normalized.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::SearchError;
use crate::index::{Cluster, Index, Member};
use crate::search::types::{SearchParams, SearchResult};
use crate::vector::{ClusterId, Score, dot_product};

/// A scored member reference produced by the fine stage.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cluster_id: ClusterId,
    position: usize,
    score: Score,
}

/// Descending by score; equal scores compare equal so stable sorts keep order.
fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.cmp(&a.score)
}

fn check_query(index: &Index, query: &[f32]) -> Result<(), SearchError> {
    let expected = index.dimension().get();
    if query.len() != expected {
        return Err(SearchError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }
    if let Some(position) = query.iter().position(|v| !v.is_finite()) {
        return Err(SearchError::InvalidQuery { index: position });
    }
    Ok(())
}

/// Coarse stage: the `m` clusters whose centroids best match the query.
fn select_clusters(index: &Index, query: &[f32], m: usize) -> Vec<ClusterId> {
    let mut scored: Vec<(ClusterId, Score)> = index
        .centroids()
        .iter()
        .filter_map(|c| {
            Score::from_similarity(dot_product(query, c.vector.as_slice()))
                .map(|score| (c.cluster_id, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    // Each cluster is scanned at most once, at its best centroid score.
    let mut seen = HashSet::with_capacity(scored.len());
    scored.retain(|(id, _)| seen.insert(*id));
    scored.truncate(m);
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Fine stage: exact top-k scan of one cluster.
fn scan_cluster(cluster: &Cluster, query: &[f32], k: usize) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = cluster
        .members()
        .iter()
        .enumerate()
        .filter_map(|(position, member)| {
            Score::from_similarity(dot_product(query, member.vector.as_slice())).map(|score| {
                Candidate {
                    cluster_id: cluster.id(),
                    position,
                    score,
                }
            })
        })
        .collect();

    candidates.sort_by(by_score_desc);
    candidates.truncate(k);
    candidates
}

fn to_result(member: &Member, candidate: &Candidate) -> SearchResult {
    SearchResult {
        id: member.record.id.clone(),
        text: member.record.text.clone(),
        metadata: member.record.metadata.clone(),
        score: candidate.score,
        cluster_id: candidate.cluster_id,
    }
}

fn materialize(index: &Index, candidates: &[Candidate]) -> Vec<SearchResult> {
    candidates
        .iter()
        .filter_map(|c| {
            index
                .cluster(c.cluster_id)
                .and_then(|cluster| cluster.members().get(c.position))
                .map(|member| to_result(member, c))
        })
        .collect()
}

/// Two-stage search over a loaded index.
///
/// Returns an empty list when nothing in the selected clusters is loaded.
/// Fails only on malformed queries; the index is never modified.
pub fn search(
    index: &Index,
    query: &[f32],
    params: &SearchParams,
) -> Result<Vec<SearchResult>, SearchError> {
    check_query(index, query)?;

    let selected = select_clusters(index, query, params.top_m_clusters());

    let mut candidates: Vec<Candidate> = selected
        .iter()
        .filter_map(|id| index.cluster(*id))
        .flat_map(|cluster| scan_cluster(cluster, query, params.top_k_per_cluster()))
        .collect();

    candidates.sort_by(by_score_desc);
    candidates.truncate(params.final_top_n());

    Ok(materialize(index, &candidates))
}

/// Brute-force exact search over every loaded document.
///
/// Serves as the recall reference for [`search`].
pub fn exact_search(
    index: &Index,
    query: &[f32],
    final_top_n: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    check_query(index, query)?;
    if final_top_n < 1 {
        return Err(SearchError::InvalidParameter {
            name: "final_top_n",
            value: final_top_n,
        });
    }

    let mut candidates: Vec<Candidate> = index
        .clusters()
        .values()
        .flat_map(|cluster| scan_cluster(cluster, query, cluster.count()))
        .collect();

    candidates.sort_by(by_score_desc);
    candidates.truncate(final_top_n);

    Ok(materialize(index, &candidates))
}

/// Search engine over a shared, immutable index.
///
/// Cloning is cheap and clones share the same index.
#[derive(Debug, Clone)]
pub struct ClusteredSearchEngine {
    index: Arc<Index>,
}

impl ClusteredSearchEngine {
    #[must_use]
    pub fn new(index: Arc<Index>) -> Self {
        Self { index }
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use = "Search results should be processed to retrieve relevant documents"]
    pub fn search(
        &self,
        query: &[f32],
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>, SearchError> {
        search(&self.index, query, params)
    }

    pub fn exact_search(
        &self,
        query: &[f32],
        final_top_n: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        exact_search(&self.index, query, final_top_n)
    }
}
