//! Sampled similarity distribution, used to pick a clustering threshold.
//!
//! A random subset of the corpus is drawn and each sampled record is compared
//! with the next few records in sample order only. This keeps the cost linear
//! in the sample size; the numbers are indicative, not exhaustive.

use rand::rngs::StdRng;
use rand::{SeedableRng, seq::index};
use serde::{Deserialize, Serialize};

use crate::core::record::Record;
use crate::core::similarity::SimilarityScorer;

/// Sampling knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig
{
    /// Maximum records drawn from the corpus
    pub sample_size: usize,
    /// How many following records each sampled record is compared with
    pub window: usize,
    /// Pairs strictly above this similarity are kept as examples
    pub example_floor: f64,
    /// Cap on kept example pairs
    pub max_examples: usize,
    /// Fixed seed for repeatable samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SamplerConfig
{
    fn default() -> Self
    {
        Self { sample_size: 1000, window: 10, example_floor: 0.8, max_examples: 10, seed: None }
    }
}

/// One high-similarity pair seen while sampling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPair
{
    pub uuid1: String,
    pub uuid2: String,
    pub similarity: f64,
}

/// Aggregate statistics over the sampled pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats
{
    pub sampled_records: usize,
    pub total_comparisons: usize,
    pub avg_similarity: f64,
    pub max_similarity: f64,
    pub min_similarity: f64,
    /// Pairs above 0.90
    pub high_similarity_count: usize,
    /// Pairs above 0.95
    pub very_high_similarity_count: usize,
    /// Pairs above 0.99
    pub exact_duplicates: usize,
    pub high_similarity_examples: Vec<SimilarPair>,
}

/// Sampler result; an empty sample is reported, never raised
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Distribution
{
    NoData
    {
        error: String,
    },
    Measured(DistributionStats),
}

impl Distribution
{
    fn no_data() -> Self
    {
        Distribution::NoData { error: "No similarities calculated".to_string() }
    }

    pub fn stats(&self) -> Option<&DistributionStats>
    {
        match self
        {
            Distribution::Measured(s) => Some(s),
            Distribution::NoData { .. } => None,
        }
    }
}

/// Draws a sample and summarises windowed pair similarities
pub struct DistributionSampler<'s>
{
    scorer: &'s SimilarityScorer,
    config: SamplerConfig,
}

impl<'s> DistributionSampler<'s>
{
    pub fn new(
        scorer: &'s SimilarityScorer,
        config: SamplerConfig,
    ) -> Self
    {
        Self { scorer, config }
    }

    pub fn config(&self) -> &SamplerConfig
    {
        &self.config
    }

    /// Sample `records` and compute the distribution
    pub fn sample(
        &self,
        records: &[Record],
    ) -> Distribution
    {
        self.sample_with_progress(records, &|_, _| {})
    }

    /// Like [`sample`](Self::sample), reporting `(done, total)` sampled rows
    pub fn sample_with_progress(
        &self,
        records: &[Record],
        on_row: &dyn Fn(usize, usize),
    ) -> Distribution
    {
        let picked = sample_indices(records.len(), self.config.sample_size, self.config.seed);
        let sample: Vec<&Record> = picked
            .iter()
            .map(|&i| &records[i])
            .collect();

        let prepared: Vec<_> = sample
            .iter()
            .map(|r| {
                self.scorer
                    .prepare(r)
            })
            .collect();

        let mut sims: Vec<f64> = Vec::new();
        let mut examples: Vec<SimilarPair> = Vec::new();

        for i in 0..prepared.len()
        {
            let end = (i + 1 + self.config.window).min(prepared.len());
            for j in (i + 1)..end
            {
                let s = self
                    .scorer
                    .prepared_similarity(&prepared[i], &prepared[j]);
                sims.push(s);

                if s > self.config.example_floor && examples.len() < self.config.max_examples
                {
                    examples.push(SimilarPair {
                        uuid1: sample[i]
                            .id
                            .clone(),
                        uuid2: sample[j]
                            .id
                            .clone(),
                        similarity: s,
                    });
                }
            }
            on_row(i + 1, prepared.len());
        }

        summarize(sample.len(), &sims, examples)
    }
}

fn summarize(
    sampled: usize,
    sims: &[f64],
    examples: Vec<SimilarPair>,
) -> Distribution
{
    if sims.is_empty()
    {
        return Distribution::no_data();
    }

    let above = |t: f64| {
        sims.iter()
            .filter(|&&s| s > t)
            .count()
    };

    Distribution::Measured(DistributionStats {
        sampled_records: sampled,
        total_comparisons: sims.len(),
        avg_similarity: sims
            .iter()
            .sum::<f64>()
            / sims.len() as f64,
        max_similarity: sims
            .iter()
            .copied()
            .fold(f64::MIN, f64::max),
        min_similarity: sims
            .iter()
            .copied()
            .fold(f64::MAX, f64::min),
        high_similarity_count: above(0.90),
        very_high_similarity_count: above(0.95),
        exact_duplicates: above(0.99),
        high_similarity_examples: examples,
    })
}

/// Uniformly pick up to `amount` of `len` indices.
///
/// When the corpus fits, every index is returned in corpus order; otherwise
/// the picked indices come back in random order.
pub fn sample_indices(
    len: usize,
    amount: usize,
    seed: Option<u64>,
) -> Vec<usize>
{
    if len <= amount
    {
        return (0..len).collect();
    }

    let mut rng = match seed
    {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    index::sample(&mut rng, len, amount).into_vec()
}
