//! Category bucketing.
//!
//! Records are only ever compared inside their own (category, subcategory)
//! bucket. Buckets partition the corpus exactly and keep the original corpus
//! indices, in ascending order, for reconciliation after clustering.

use indexmap::IndexMap;

use crate::core::record::Record;

/// One partition of the corpus sharing an exact category pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket
{
    /// Display key: `category + "_" + subcategory`
    pub key: String,
    pub category: String,
    pub subcategory: String,
    /// Original corpus indices, ascending
    pub indices: Vec<usize>,
}

impl Bucket
{
    pub fn len(&self) -> usize
    {
        self.indices
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.indices
            .is_empty()
    }

    /// Whether clustering has anything to compare
    pub fn is_comparable(&self) -> bool
    {
        self.len() >= 2
    }

    /// Number of unordered pairs, `n(n-1)/2`
    pub fn pair_count(&self) -> u64
    {
        pair_count(self.len())
    }
}

/// `n(n-1)/2` without overflow for corpus-sized `n`
pub fn pair_count(n: usize) -> u64
{
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

/// Display key for a category pair
pub fn bucket_key(
    category: &str,
    subcategory: &str,
) -> String
{
    format!("{category}_{subcategory}")
}

/// Partitions a corpus by category pair
pub struct Bucketer;

impl Bucketer
{
    /// Group `records` into buckets in first-seen key order.
    ///
    /// The grouping key is the (category, subcategory) pair itself, so pairs
    /// whose joined display keys happen to coincide still land apart.
    pub fn partition(records: &[Record]) -> Vec<Bucket>
    {
        let mut groups: IndexMap<(&str, &str), Vec<usize>> = IndexMap::new();

        for (idx, rec) in records
            .iter()
            .enumerate()
        {
            groups
                .entry((rec.category.as_str(), rec.subcategory.as_str()))
                .or_default()
                .push(idx);
        }

        groups
            .into_iter()
            .map(|((category, subcategory), indices)| Bucket {
                key: bucket_key(category, subcategory),
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                indices,
            })
            .collect()
    }
}
