//! JSON documents written by `find` and `dedupe`.
//!
//! Field names follow the on-disk format consumed by downstream tooling, so
//! they are spelled out explicitly rather than derived from Rust names.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::cluster::{Cluster, Clustering};
use crate::core::record::Record;
use crate::core::sampler::Distribution;

/// How many categories `most_common` lists
pub const MOST_COMMON_LIMIT: usize = 10;

/// Label written into dedupe reports
pub const ANALYSIS_METHOD: &str = "TF-IDF + code structure + sequence ratio";

/// File name of the k-th group document
pub fn group_file_name(
    base_name: &str,
    group_id: usize,
) -> String
{
    format!("{base_name}_similar_group_{group_id}.json")
}

pub fn summary_file_name(base_name: &str) -> String
{
    format!("{base_name}_similarity_summary.json")
}

pub fn report_file_name(base_name: &str) -> String
{
    format!("{base_name}_analysis_report.json")
}

/// One entry of `groups_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo
{
    pub group_id: usize,
    #[serde(default)]
    pub file: String,
    pub count: usize,
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error_type_detail: String,
    pub uuids: Vec<String>,
}

/// `<base>_similarity_summary.json`
///
/// Counters beyond `total_groups`/`total_duplicates` default to zero, and the
/// threshold to absent, so summaries written by older tooling still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilaritySummary
{
    pub total_groups: usize,
    pub total_duplicates: usize,
    #[serde(default)]
    pub total_buckets: usize,
    #[serde(default)]
    pub comparisons_made: u64,
    #[serde(default)]
    pub naive_comparisons: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold_used: Option<f64>,
    pub groups_info: Vec<GroupInfo>,
}

impl SimilaritySummary
{
    pub fn from_clustering(
        clustering: &Clustering,
        records: &[Record],
        base_name: &str,
        threshold: f64,
    ) -> Self
    {
        let groups_info = clustering
            .clusters
            .iter()
            .map(|c| GroupInfo {
                group_id: c.id,
                file: group_file_name(base_name, c.id),
                count: c.len(),
                error_type: c
                    .category
                    .clone(),
                error_type_detail: c
                    .subcategory
                    .clone(),
                uuids: owned_ids(c, records),
            })
            .collect();

        Self {
            total_groups: clustering
                .clusters
                .len(),
            total_duplicates: clustering.total_duplicates(),
            total_buckets: clustering.bucket_count,
            comparisons_made: clustering.comparisons,
            naive_comparisons: clustering.naive_comparisons,
            similarity_threshold_used: Some(threshold),
            groups_info,
        }
    }

    /// Ids a deduplication pass drops: every group member but the first.
    ///
    /// Ids that some group keeps are never dropped, even when they also
    /// appear as a later member elsewhere.
    pub fn ids_to_remove(&self) -> HashSet<&str>
    {
        let keep: HashSet<&str> = self
            .groups_info
            .iter()
            .filter(|g| g.uuids.len() > 1)
            .map(|g| g.uuids[0].as_str())
            .collect();

        self.groups_info
            .iter()
            .flat_map(|g| {
                g.uuids
                    .iter()
                    .skip(1)
            })
            .map(String::as_str)
            .filter(|id| !keep.contains(id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary
{
    pub total_records: usize,
    pub similar_groups_found: usize,
    pub total_duplicates: usize,
    pub duplicate_ratio: f64,
    pub similarity_threshold_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTypeAnalysis
{
    /// Records per category, in first-seen order
    pub distribution: IndexMap<String, usize>,
    /// Top categories as `[name, count]`, count descending then name
    pub most_common: Vec<(String, usize)>,
}

impl ErrorTypeAnalysis
{
    pub fn from_records(records: &[Record]) -> Self
    {
        let mut distribution: IndexMap<String, usize> = IndexMap::new();
        for rec in records
        {
            *distribution
                .entry(
                    rec.category
                        .clone(),
                )
                .or_default() += 1;
        }

        let most_common = distribution
            .iter()
            .sorted_by(|(na, ca), (nb, cb)| {
                cb.cmp(ca)
                    .then_with(|| na.cmp(nb))
            })
            .take(MOST_COMMON_LIMIT)
            .map(|(name, &count)| (name.clone(), count))
            .collect();

        Self { distribution, most_common }
    }
}

/// Per-group line of the analysis report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDigest
{
    pub group_id: usize,
    pub size: usize,
    pub error_type: String,
    pub error_type_detail: String,
    pub uuids: Vec<String>,
    pub avg_diversity_score: f64,
    pub avg_retention_ratio: f64,
}

impl GroupDigest
{
    pub fn new(
        cluster: &Cluster,
        records: &[Record],
    ) -> Self
    {
        let mean = |field: &str| {
            cluster
                .members
                .iter()
                .map(|&i| records[i].numeric_field(field))
                .sum::<f64>()
                / cluster
                    .len()
                    .max(1) as f64
        };

        Self {
            group_id: cluster.id,
            size: cluster.len(),
            error_type: cluster
                .category
                .clone(),
            error_type_detail: cluster
                .subcategory
                .clone(),
            uuids: owned_ids(cluster, records),
            avg_diversity_score: mean("diversity_score"),
            avg_retention_ratio: mean("retention_ratio"),
        }
    }
}

/// `<base>_analysis_report.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport
{
    pub analysis_summary: AnalysisSummary,
    pub similarity_distribution: Distribution,
    pub error_type_analysis: ErrorTypeAnalysis,
    pub duplicate_groups_summary: Vec<GroupDigest>,
}

impl AnalysisReport
{
    pub fn new(
        records: &[Record],
        clustering: &Clustering,
        distribution: Distribution,
        threshold: f64,
    ) -> Self
    {
        let total_duplicates = clustering.total_duplicates();
        let duplicate_ratio = if records.is_empty()
        {
            0.0
        }
        else
        {
            total_duplicates as f64 / records.len() as f64
        };

        Self {
            analysis_summary: AnalysisSummary {
                total_records: records.len(),
                similar_groups_found: clustering
                    .clusters
                    .len(),
                total_duplicates,
                duplicate_ratio,
                similarity_threshold_used: threshold,
            },
            similarity_distribution: distribution,
            error_type_analysis: ErrorTypeAnalysis::from_records(records),
            duplicate_groups_summary: clustering
                .clusters
                .iter()
                .map(|c| GroupDigest::new(c, records))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeduplicationSummary
{
    pub original_count: usize,
    pub final_count: usize,
    pub removed_count: usize,
    /// Percentage, two decimals
    pub deduplication_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupeAnalysis
{
    pub total_similar_groups: usize,
    pub total_duplicates_found: usize,
    pub analysis_method: String,
    pub similarity_threshold: String,
}

/// `<output stem>_deduplication_report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupeReport
{
    pub deduplication_summary: DeduplicationSummary,
    pub similarity_analysis: DedupeAnalysis,
    /// Group size → number of groups with that size
    pub group_size_distribution: BTreeMap<usize, usize>,
}

impl DedupeReport
{
    /// `fallback_threshold` is reported only when the summary does not
    /// record the threshold it was produced with
    pub fn new(
        original_count: usize,
        final_count: usize,
        summary: &SimilaritySummary,
        fallback_threshold: f64,
    ) -> Self
    {
        let threshold = summary
            .similarity_threshold_used
            .unwrap_or(fallback_threshold);
        let removed_count = original_count.saturating_sub(final_count);
        let rate = if original_count == 0
        {
            0.0
        }
        else
        {
            removed_count as f64 / original_count as f64 * 100.0
        };

        let group_size_distribution = summary
            .groups_info
            .iter()
            .map(|g| g.count)
            .counts()
            .into_iter()
            .collect();

        Self {
            deduplication_summary: DeduplicationSummary {
                original_count,
                final_count,
                removed_count,
                deduplication_rate: (rate * 100.0).round() / 100.0,
            },
            similarity_analysis: DedupeAnalysis {
                total_similar_groups: summary.total_groups,
                total_duplicates_found: summary.total_duplicates,
                analysis_method: ANALYSIS_METHOD.to_string(),
                similarity_threshold: format!("{:.0}%", threshold * 100.0),
            },
            group_size_distribution,
        }
    }
}

fn owned_ids(
    cluster: &Cluster,
    records: &[Record],
) -> Vec<String>
{
    cluster
        .member_ids(records)
        .into_iter()
        .map(str::to_string)
        .collect()
}
