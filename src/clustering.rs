
use derive_builder::Builder;
use indexmap::IndexMap;
use log::{debug, error, info};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::data_types::table::DataTable;

/// Default number of condensed distance matrices the cache retains.
pub const DISTANCE_CACHE_CAPACITY: usize = 10;

/// Failures in the sample clustering engine.
#[derive(thiserror::Error, Debug)]
pub enum ClusteringError {
    #[error("column '{column}' must be present in the input table")]
    MissingColumn { column: String },
    #[error("at least two samples are required for clustering, got {found}")]
    InsufficientSamples { found: usize },
    #[error("numerical failure while clustering: {details}")]
    Numeric { details: String }
}

/// Pairwise distance metrics for the sample-by-ortholog matrix.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum_macros::Display, strum_macros::EnumString, serde::Serialize, clap::ValueEnum)]
pub enum DistanceMetric {
    #[default]
    #[strum(ascii_case_insensitive, serialize = "euclidean")]
    #[clap(name = "euclidean")]
    Euclidean,
    #[strum(ascii_case_insensitive, serialize = "cityblock")]
    #[clap(name = "cityblock")]
    Cityblock,
    #[strum(ascii_case_insensitive, serialize = "cosine")]
    #[clap(name = "cosine")]
    Cosine,
    #[strum(ascii_case_insensitive, serialize = "chebyshev")]
    #[clap(name = "chebyshev")]
    Chebyshev
}

/// Agglomeration strategies for the hierarchical clustering step.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum_macros::Display, strum_macros::EnumString, serde::Serialize, clap::ValueEnum)]
pub enum LinkageMethod {
    #[strum(ascii_case_insensitive, serialize = "single")]
    #[clap(name = "single")]
    Single,
    #[strum(ascii_case_insensitive, serialize = "complete")]
    #[clap(name = "complete")]
    Complete,
    #[default]
    #[strum(ascii_case_insensitive, serialize = "average")]
    #[clap(name = "average")]
    Average,
    #[strum(ascii_case_insensitive, serialize = "ward")]
    #[clap(name = "ward")]
    Ward
}

/// Configuration for one clustering call.
#[derive(Builder, Clone, Copy, Debug)]
pub struct ClusterConfig {
    /// The distance metric for the pairwise matrix
    #[builder(default = "DistanceMetric::Euclidean")]
    pub metric: DistanceMetric,
    /// The agglomeration method for the linkage step
    #[builder(default = "LinkageMethod::Average")]
    pub method: LinkageMethod
}

/// A bounded memo of condensed distance matrices keyed by (matrix content
/// signature, metric). Eviction is oldest-inserted-first; mutation is
/// mutex-guarded so one cache may be shared by concurrently serving threads.
/// The cache is owned by the caller and injected into each clustering call,
/// giving it process scope in the CLI without hidden global state.
#[derive(Debug, Default)]
pub struct DistanceCache {
    entries: Mutex<IndexMap<(u64, DistanceMetric), Vec<f64>>>
}

impl DistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached distance matrix.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        info!("Distance matrix cache cleared");
    }

    fn get(&self, key: (u64, DistanceMetric)) -> Option<Vec<f64>> {
        let entries = self.entries.lock().unwrap();
        let hit = entries.get(&key).cloned();
        match hit {
            Some(_) => debug!("Cache hit for distance matrix with metric: {}", key.1),
            None => debug!("Cache miss for distance matrix with metric: {}", key.1)
        }
        hit
    }

    fn insert(&self, key: (u64, DistanceMetric), distances: Vec<f64>) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= DISTANCE_CACHE_CAPACITY && !entries.contains_key(&key) {
            entries.shift_remove_index(0);
            debug!("Cache size limit reached, removed oldest entry");
        }
        entries.insert(key, distances);
    }
}

/// One merge step of the agglomeration. Cluster ids follow the usual linkage
/// convention: the original samples are `0..n`, and the cluster formed at
/// step `i` has id `n + i`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct LinkageStep {
    /// The smaller id of the merged pair
    pub cluster_a: usize,
    /// The larger id of the merged pair
    pub cluster_b: usize,
    /// The inter-cluster distance at which the merge happened
    pub distance: f64,
    /// Number of original samples in the merged cluster
    pub size: usize
}

/// The full output of one hierarchical clustering run: the sample labels in
/// leaf-id order plus the N-1 merge steps.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LinkageMatrix {
    /// Sample labels; leaf id `i` is `samples[i]`
    pub samples: Vec<String>,
    /// The merge steps, in order
    pub steps: Vec<LinkageStep>
}

impl LinkageMatrix {
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Hierarchically clusters samples by their ortholog occurrence profiles.
///
/// The table is pivoted to a sample-by-ortholog occurrence-count matrix,
/// pairwise distances are computed under the configured metric (memoized in
/// the injected cache), and agglomerative clustering with the configured
/// method produces the linkage matrix. The result is fully deterministic:
/// identical (table, metric, method) inputs produce bit-identical output
/// regardless of cache state.
/// # Arguments
/// * `table` - a table carrying `sample` and `ko`
/// * `config` - metric and linkage method
/// * `cache` - the process-scoped distance cache
/// # Errors
/// * `MissingColumn` / `InsufficientSamples` on contract violations
/// * `Numeric` if a distance does not evaluate to a finite value
pub fn calculate_sample_clustering(
    table: &DataTable,
    config: &ClusterConfig,
    cache: &DistanceCache
) -> Result<LinkageMatrix, ClusteringError> {
    info!("Starting clustering with metric: {} and method: {}", config.metric, config.method);

    for column in ["sample", "ko"] {
        if !table.has_column(column) {
            let err = ClusteringError::MissingColumn { column: column.to_string() };
            error!("Clustering rejected: {err}");
            return Err(err);
        }
    }

    let (samples, counts) = pivot_occurrences(table);
    if samples.len() < 2 {
        let err = ClusteringError::InsufficientSamples { found: samples.len() };
        error!("Clustering rejected: {err}");
        return Err(err);
    }

    let key = (matrix_signature(&samples, &counts), config.metric);
    let distances = match cache.get(key) {
        Some(cached) => cached,
        None => {
            debug!("Computing new distance matrix with metric: {}", config.metric);
            let computed = pairwise_distances(&counts, config.metric)?;
            cache.insert(key, computed.clone());
            computed
        }
    };

    // the linkage step is cheap relative to the distance matrix, so it is always recomputed
    let steps = linkage(&distances, samples.len(), config.method);
    info!("Clustering completed: {} merge steps", steps.len());
    Ok(LinkageMatrix {
        samples,
        steps
    })
}

/// Pivots the (sample, ko) rows into an occurrence-count matrix. Samples and
/// orthologs are ordered by first appearance; duplicates increment the count.
fn pivot_occurrences(table: &DataTable) -> (Vec<String>, Vec<Vec<f64>>) {
    let samples = table.distinct_str_values("sample");
    let orthologs = table.distinct_str_values("ko");

    let sample_index: IndexMap<&str, usize> = samples.iter().map(|s| s.as_str()).zip(0..).collect();
    let ortholog_index: IndexMap<&str, usize> = orthologs.iter().map(|k| k.as_str()).zip(0..).collect();

    let mut counts = vec![vec![0f64; orthologs.len()]; samples.len()];
    for row in 0..table.num_rows() {
        let sample = table.str_value("sample", row).unwrap_or_default();
        let ko = table.str_value("ko", row).unwrap_or_default();
        if let (Some(&i), Some(&j)) = (sample_index.get(sample), ortholog_index.get(ko)) {
            counts[i][j] += 1.0;
        }
    }

    (samples, counts)
}

/// Signature over the pivoted matrix content, used as the cache key component.
fn matrix_signature(samples: &[String], counts: &[Vec<f64>]) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    samples.len().hash(&mut hasher);
    for sample in samples {
        sample.hash(&mut hasher);
    }
    for row in counts {
        row.len().hash(&mut hasher);
        for &value in row {
            value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Computes the condensed pairwise distance vector (row-major upper triangle).
fn pairwise_distances(counts: &[Vec<f64>], metric: DistanceMetric) -> Result<Vec<f64>, ClusteringError> {
    let n = counts.len();
    let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(&counts[i], &counts[j], metric);
            if !d.is_finite() {
                let err = ClusteringError::Numeric {
                    details: format!("{metric} distance between samples #{i} and #{j} is not finite")
                };
                error!("Unexpected error during clustering calculation: {err}");
                return Err(err);
            }
            condensed.push(d);
        }
    }
    Ok(condensed)
}

fn distance(a: &[f64], b: &[f64], metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => {
            a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
        },
        DistanceMetric::Cityblock => {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
        },
        DistanceMetric::Cosine => {
            let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
            let norm_b: f64 = b.iter().map(|y| y * y).sum::<f64>().sqrt();
            1.0 - dot / (norm_a * norm_b)
        },
        DistanceMetric::Chebyshev => {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
        }
    }
}

/// Agglomerative clustering over a condensed distance vector using
/// Lance-Williams updates. Ties resolve to the first pair in scan order
/// (ascending positions), so the output is deterministic for a given input.
fn linkage(condensed: &[f64], n: usize, method: LinkageMethod) -> Vec<LinkageStep> {
    // expand to a mutable full matrix over the active clusters
    let mut dist = vec![vec![0f64; n]; n];
    let mut idx = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            dist[i][j] = condensed[idx];
            dist[j][i] = condensed[idx];
            idx += 1;
        }
    }

    // active cluster bookkeeping: (id, size) per matrix position
    let mut active: Vec<(usize, usize)> = (0..n).map(|i| (i, 1)).collect();
    let mut steps = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        // closest active pair; strict less-than keeps the first tie winner
        let mut best = (0usize, 1usize);
        let mut best_d = f64::INFINITY;
        for i in 0..active.len() {
            for j in (i + 1)..active.len() {
                if dist[i][j] < best_d {
                    best_d = dist[i][j];
                    best = (i, j);
                }
            }
        }
        let (pi, pj) = best;
        let (id_i, size_i) = active[pi];
        let (id_j, size_j) = active[pj];
        let merged_size = size_i + size_j;

        steps.push(LinkageStep {
            cluster_a: id_i.min(id_j),
            cluster_b: id_i.max(id_j),
            distance: best_d,
            size: merged_size
        });

        // Lance-Williams update of distances from the merged cluster to the rest
        let updated: Vec<f64> = (0..active.len())
            .map(|k| {
                if k == pi || k == pj {
                    return 0.0;
                }
                let d_ik = dist[pi][k];
                let d_jk = dist[pj][k];
                let size_k = active[k].1;
                match method {
                    LinkageMethod::Single => d_ik.min(d_jk),
                    LinkageMethod::Complete => d_ik.max(d_jk),
                    LinkageMethod::Average => {
                        (size_i as f64 * d_ik + size_j as f64 * d_jk) / merged_size as f64
                    },
                    LinkageMethod::Ward => {
                        let total = (merged_size + size_k) as f64;
                        (((size_i + size_k) as f64 * d_ik * d_ik
                            + (size_j + size_k) as f64 * d_jk * d_jk
                            - size_k as f64 * best_d * best_d) / total).sqrt()
                    }
                }
            })
            .collect();

        // merged cluster takes position pi; position pj is retired
        for k in 0..active.len() {
            dist[pi][k] = updated[k];
            dist[k][pi] = updated[k];
        }
        dist[pi][pi] = 0.0;
        active[pi] = (n + step, merged_size);

        for row in dist.iter_mut() {
            row.remove(pj);
        }
        dist.remove(pj);
        active.remove(pj);
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use crate::data_types::annotation::{records_to_table, AnnotationRecord};

    fn three_sample_table() -> DataTable {
        // S1 and S2 share the same profile; S3 is distant
        records_to_table(&[
            AnnotationRecord::new("S1", "K00001"),
            AnnotationRecord::new("S1", "K00002"),
            AnnotationRecord::new("S2", "K00001"),
            AnnotationRecord::new("S2", "K00002"),
            AnnotationRecord::new("S3", "K00003"),
            AnnotationRecord::new("S3", "K00003"),
            AnnotationRecord::new("S3", "K00003")
        ])
    }

    fn shifted_table(offset: usize) -> DataTable {
        records_to_table(&[
            AnnotationRecord::new("A", &format!("K{:05}", offset)),
            AnnotationRecord::new("B", &format!("K{:05}", offset + 1))
        ])
    }

    fn default_config() -> ClusterConfig {
        ClusterConfigBuilder::default().build().unwrap()
    }

    #[test]
    fn test_single_linkage_known_values() {
        let config = ClusterConfigBuilder::default()
            .metric(DistanceMetric::Euclidean)
            .method(LinkageMethod::Single)
            .build().unwrap();
        let cache = DistanceCache::new();
        let result = calculate_sample_clustering(&three_sample_table(), &config, &cache).unwrap();

        assert_eq!(result.num_samples(), 3);
        assert_eq!(result.steps.len(), 2);

        // S1 and S2 are identical profiles, so they merge first at distance 0
        assert_eq!(result.steps[0].cluster_a, 0);
        assert_eq!(result.steps[0].cluster_b, 1);
        assert_approx_eq!(result.steps[0].distance, 0.0);
        assert_eq!(result.steps[0].size, 2);

        // the merged pair then joins S3; profiles are (1,1,0) vs (0,0,3)
        assert_eq!(result.steps[1].cluster_a, 2);
        assert_eq!(result.steps[1].cluster_b, 3);
        assert_approx_eq!(result.steps[1].distance, 11.0f64.sqrt());
        assert_eq!(result.steps[1].size, 3);
    }

    #[test]
    fn test_cityblock_metric() {
        let config = ClusterConfigBuilder::default()
            .metric(DistanceMetric::Cityblock)
            .method(LinkageMethod::Single)
            .build().unwrap();
        let cache = DistanceCache::new();
        let result = calculate_sample_clustering(&three_sample_table(), &config, &cache).unwrap();
        // |1-0| + |1-0| + |0-3| = 5
        assert_approx_eq!(result.steps[1].distance, 5.0);
    }

    #[test]
    fn test_clustering_is_deterministic_across_cache_states() {
        let table = three_sample_table();
        let config = default_config();

        let cold_cache = DistanceCache::new();
        let first = calculate_sample_clustering(&table, &config, &cold_cache).unwrap();
        // second run hits the cache; third run uses a fresh cache
        let second = calculate_sample_clustering(&table, &config, &cold_cache).unwrap();
        let third = calculate_sample_clustering(&table, &config, &DistanceCache::new()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_insufficient_samples() {
        let table = records_to_table(&[AnnotationRecord::new("S1", "K00001")]);
        let result = calculate_sample_clustering(&table, &default_config(), &DistanceCache::new());
        assert!(matches!(result, Err(ClusteringError::InsufficientSamples { found: 1 })));
    }

    #[test]
    fn test_missing_columns() {
        let table = DataTable::from_str_columns(vec![
            ("sample", vec!["S1".to_string()])
        ]);
        let result = calculate_sample_clustering(&table, &default_config(), &DistanceCache::new());
        assert!(matches!(result, Err(ClusteringError::MissingColumn { .. })));
    }

    #[test]
    fn test_cache_bound_after_eleven_distinct_keys() {
        let cache = DistanceCache::new();
        let config = default_config();
        for offset in 0..11 {
            calculate_sample_clustering(&shifted_table(offset), &config, &cache).unwrap();
        }
        assert_eq!(cache.len(), DISTANCE_CACHE_CAPACITY);
    }

    #[test]
    fn test_cache_evicts_oldest_inserted_first() {
        let cache = DistanceCache::new();
        let config = default_config();

        let first_key = {
            let (samples, counts) = pivot_occurrences(&shifted_table(0));
            (matrix_signature(&samples, &counts), config.metric)
        };
        for offset in 0..11 {
            calculate_sample_clustering(&shifted_table(offset), &config, &cache).unwrap();
        }
        // the first-inserted entry is the one that fell out
        assert!(!cache.entries.lock().unwrap().contains_key(&first_key));
    }

    #[test]
    fn test_cache_clear() {
        let cache = DistanceCache::new();
        calculate_sample_clustering(&three_sample_table(), &default_config(), &cache).unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ward_linkage_shape() {
        let config = ClusterConfigBuilder::default()
            .method(LinkageMethod::Ward)
            .build().unwrap();
        let table = records_to_table(&[
            AnnotationRecord::new("S1", "K00001"),
            AnnotationRecord::new("S2", "K00002"),
            AnnotationRecord::new("S3", "K00003"),
            AnnotationRecord::new("S4", "K00001")
        ]);
        let result = calculate_sample_clustering(&table, &config, &DistanceCache::new()).unwrap();

        assert_eq!(result.steps.len(), 3);
        // every merge distance is non-decreasing for ward on these profiles
        assert!(result.steps.windows(2).all(|w| w[0].distance <= w[1].distance));
        // the final merge contains every sample
        assert_eq!(result.steps[2].size, 4);
        // merged cluster ids follow the n + step convention
        assert!(result.steps[2].cluster_b >= 4);
    }
}
