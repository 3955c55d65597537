//! Greedy seed-based duplicate clustering.
//!
//! Inside a bucket, indices are visited in ascending order. Each unprocessed
//! index seeds a cluster and absorbs every later unprocessed index whose
//! similarity *to the seed* reaches the threshold. Members are not required
//! to be similar to each other. Seeds without neighbours are discarded, so
//! every emitted cluster has at least two members and its first member (the
//! seed, lowest index) is the representative.
//!
//! Buckets are independent; the corpus driver runs them sequentially or on a
//! rayon pool and produces the same clusters either way.

use std::cell::Cell;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::bucket::{Bucket, Bucketer, pair_count};
use crate::core::record::Record;
use crate::core::similarity::{PreparedRecord, SimilarityMatrix, SimilarityScorer};

/// Default near-duplicate threshold
pub const DEFAULT_THRESHOLD: f64 = 0.90;

/// Source of pairwise similarities for one bucket
pub trait PairwiseSimilarity
{
    /// Number of items in the bucket
    fn len(&self) -> usize;

    /// Similarity of bucket-local items `i` and `j`
    fn similarity(
        &self,
        i: usize,
        j: usize,
    ) -> f64;

    fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

impl PairwiseSimilarity for SimilarityMatrix
{
    fn len(&self) -> usize
    {
        SimilarityMatrix::len(self)
    }

    fn similarity(
        &self,
        i: usize,
        j: usize,
    ) -> f64
    {
        self.get(i, j)
    }
}

/// Computes similarities lazily and counts how many were asked for
pub struct OnDemandSimilarity<'s, 'r>
{
    scorer: &'s SimilarityScorer,
    items: &'s [PreparedRecord<'r>],
    comparisons: Cell<u64>,
}

impl<'s, 'r> OnDemandSimilarity<'s, 'r>
{
    pub fn new(
        scorer: &'s SimilarityScorer,
        items: &'s [PreparedRecord<'r>],
    ) -> Self
    {
        Self { scorer, items, comparisons: Cell::new(0) }
    }

    /// Pairs scored so far
    pub fn comparisons(&self) -> u64
    {
        self.comparisons
            .get()
    }
}

impl PairwiseSimilarity for OnDemandSimilarity<'_, '_>
{
    fn len(&self) -> usize
    {
        self.items
            .len()
    }

    fn similarity(
        &self,
        i: usize,
        j: usize,
    ) -> f64
    {
        if i == j
        {
            return 1.0;
        }

        self.comparisons
            .set(self.comparisons.get() + 1);
        self.scorer
            .prepared_similarity(&self.items[i], &self.items[j])
    }
}

/// Seed-based greedy grouping at a fixed threshold
#[derive(Debug, Clone, Copy)]
pub struct ClusterBuilder
{
    threshold: f64,
}

impl ClusterBuilder
{
    pub fn new(threshold: f64) -> Self
    {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64
    {
        self.threshold
    }

    /// Group bucket-local indices; returns clusters of size ≥ 2 in seed order
    pub fn build<S>(
        &self,
        sim: &S,
    ) -> Vec<Vec<usize>>
    where
        S: PairwiseSimilarity + ?Sized,
    {
        let n = sim.len();
        let mut out = Vec::new();

        if n < 2
        {
            return out;
        }

        let mut processed = vec![false; n];

        for i in 0..n
        {
            if processed[i]
            {
                continue;
            }

            processed[i] = true;
            let mut current = vec![i];

            for j in (i + 1)..n
            {
                if processed[j]
                {
                    continue;
                }

                let s = sim.similarity(i, j);
                if s >= self.threshold
                {
                    trace!(seed = i, member = j, similarity = s, "joined cluster");
                    processed[j] = true;
                    current.push(j);
                }
            }

            if current.len() > 1
            {
                out.push(current);
            }
        }

        out
    }
}

/// How bucket similarities are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode
{
    /// Full `n × n` matrix per bucket
    #[default]
    Matrix,
    /// Score only the seed-to-unprocessed pairs the scan actually reads
    OnDemand,
}

/// Settings for a clustering run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig
{
    pub threshold: f64,
    pub mode: ClusterMode,
    pub parallel: bool,
}

impl Default for ClusterConfig
{
    fn default() -> Self
    {
        Self { threshold: DEFAULT_THRESHOLD, mode: ClusterMode::Matrix, parallel: false }
    }
}

/// A group of mutual near-duplicates (by seed policy) from one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster
{
    /// 1-based ordinal, assigned after all buckets are merged
    pub id: usize,
    pub category: String,
    pub subcategory: String,
    /// Original corpus indices, ascending; the first is the representative
    pub members: Vec<usize>,
}

impl Cluster
{
    /// Corpus index of the retained member
    pub fn representative(&self) -> usize
    {
        self.members[0]
    }

    /// Members a deduplication pass would drop
    pub fn duplicates(&self) -> &[usize]
    {
        &self.members[1..]
    }

    pub fn len(&self) -> usize
    {
        self.members
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.members
            .is_empty()
    }

    /// Member ids in encounter order
    pub fn member_ids<'r>(
        &self,
        records: &'r [Record],
    ) -> Vec<&'r str>
    {
        self.members
            .iter()
            .map(|&i| records[i].id.as_str())
            .collect()
    }
}

/// Corpus-level clustering outcome
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering
{
    pub clusters: Vec<Cluster>,
    /// All buckets, including singletons
    pub bucket_count: usize,
    /// Buckets with at least two records
    pub compared_buckets: usize,
    /// Pair similarities actually computed
    pub comparisons: u64,
    /// Pairs an unbucketed all-pairs scan would need
    pub naive_comparisons: u64,
}

impl Clustering
{
    /// Sum of cluster sizes
    pub fn total_duplicates(&self) -> usize
    {
        self.clusters
            .iter()
            .map(Cluster::len)
            .sum()
    }

    /// Naive pairs per computed pair
    pub fn speedup(&self) -> f64
    {
        self.naive_comparisons as f64 / self.comparisons.max(1) as f64
    }
}

struct BucketOutcome
{
    clusters: Vec<Cluster>,
    comparisons: u64,
}

/// Cluster a whole corpus
pub fn find_clusters(
    records: &[Record],
    scorer: &SimilarityScorer,
    config: &ClusterConfig,
) -> Clustering
{
    find_clusters_with_progress(records, scorer, config, &|_| {})
}

/// Reported once per compared bucket
#[derive(Debug, Clone, Copy)]
pub struct BucketProgress<'a>
{
    pub key: &'a str,
    pub clusters_found: usize,
    /// Buckets with at least two records in this run
    pub compared_total: usize,
}

/// Cluster a whole corpus, calling `on_bucket` as each compared bucket finishes.
///
/// The callback is informational; it may be invoked from worker threads.
pub fn find_clusters_with_progress(
    records: &[Record],
    scorer: &SimilarityScorer,
    config: &ClusterConfig,
    on_bucket: &(dyn Fn(BucketProgress<'_>) + Sync),
) -> Clustering
{
    let buckets = Bucketer::partition(records);
    let comparable: Vec<&Bucket> = buckets
        .iter()
        .filter(|b| b.is_comparable())
        .collect();

    debug!(
        records = records.len(),
        buckets = buckets.len(),
        comparable = comparable.len(),
        parallel = config.parallel,
        "clustering corpus"
    );

    let run = |bucket: &&Bucket| {
        let outcome = cluster_bucket(records, bucket, scorer, config);
        on_bucket(BucketProgress {
            key: &bucket.key,
            clusters_found: outcome.clusters.len(),
            compared_total: comparable.len(),
        });
        outcome
    };

    let outcomes: Vec<BucketOutcome> = if config.parallel
    {
        comparable
            .par_iter()
            .map(run)
            .collect()
    }
    else
    {
        comparable
            .iter()
            .map(run)
            .collect()
    };

    let mut clusters = Vec::new();
    let mut comparisons = 0;
    for outcome in outcomes
    {
        comparisons += outcome.comparisons;
        clusters.extend(outcome.clusters);
    }

    // Stable global order regardless of worker scheduling
    clusters.sort_by_key(Cluster::representative);
    for (ordinal, cluster) in clusters
        .iter_mut()
        .enumerate()
    {
        cluster.id = ordinal + 1;
    }

    Clustering {
        clusters,
        bucket_count: buckets.len(),
        compared_buckets: comparable.len(),
        comparisons,
        naive_comparisons: pair_count(records.len()),
    }
}

fn cluster_bucket(
    records: &[Record],
    bucket: &Bucket,
    scorer: &SimilarityScorer,
    config: &ClusterConfig,
) -> BucketOutcome
{
    let prepared: Vec<PreparedRecord<'_>> = bucket
        .indices
        .iter()
        .map(|&i| scorer.prepare(&records[i]))
        .collect();

    let builder = ClusterBuilder::new(config.threshold);

    let (local, comparisons) = match config.mode
    {
        ClusterMode::Matrix =>
        {
            let matrix = scorer.matrix(&prepared);
            (builder.build(&matrix), bucket.pair_count())
        }
        ClusterMode::OnDemand =>
        {
            let lazy = OnDemandSimilarity::new(scorer, &prepared);
            let groups = builder.build(&lazy);
            (groups, lazy.comparisons())
        }
    };

    let clusters: Vec<Cluster> = local
        .into_iter()
        .map(|group| Cluster {
            id: 0,
            category: bucket
                .category
                .clone(),
            subcategory: bucket
                .subcategory
                .clone(),
            members: group
                .into_iter()
                .map(|l| bucket.indices[l])
                .collect(),
        })
        .collect();

    debug!(
        bucket = %bucket.key,
        size = bucket.len(),
        clusters = clusters.len(),
        comparisons,
        "bucket clustered"
    );

    BucketOutcome { clusters, comparisons }
}
