//! `find` and `analyze` commands.
//!
//! `find` samples the similarity distribution, clusters every bucket and
//! writes one JSON file per group plus a summary and an analysis report.
//! `analyze` stops after the sampling step.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};
use tracing::{info, instrument};

use crate::cli::{AnalyzeArgs, AppContext, FindArgs};
use crate::core::cluster::{Clustering, find_clusters_with_progress};
use crate::core::record::Record;
use crate::core::report::{
    AnalysisReport, ErrorTypeAnalysis, SimilaritySummary, group_file_name, report_file_name,
    summary_file_name,
};
use crate::core::sampler::{Distribution, DistributionSampler};
use crate::core::similarity::SimilarityScorer;
use crate::infra::config::{Config, load_config};
use crate::infra::io::{load_corpus, save_json};

/// Everything `find` computes before writing
#[derive(Debug, Clone)]
pub struct Detection
{
    pub distribution: Distribution,
    pub clustering: Clustering,
}

/// Sample and cluster `records` with the given settings
pub fn detect(
    records: &[Record],
    config: &Config,
    ctx: &AppContext,
) -> Detection
{
    let scorer = SimilarityScorer::new(config.weights());

    let sampler = DistributionSampler::new(&scorer, config.sampling.clone());
    let pb = progress(ctx, 0);
    pb.set_message("sampling");
    let distribution = sampler.sample_with_progress(records, &|done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    });
    pb.finish_and_clear();

    let pb = progress(ctx, 0);
    pb.set_message("clustering");
    let clustering =
        find_clusters_with_progress(records, &scorer, &config.cluster_config(), &|event| {
            pb.set_length(event.compared_total as u64);
            pb.inc(1);
            pb.set_message(event.key.to_string());
        });
    pb.finish_and_clear();

    Detection { distribution, clustering }
}

/// Write group files, summary and report into `dir`; returns written paths
pub fn write_outputs(
    records: &[Record],
    detection: &Detection,
    dir: &Path,
    base_name: &str,
    threshold: f64,
) -> Result<Vec<PathBuf>>
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();

    for cluster in &detection
        .clustering
        .clusters
    {
        let members: Vec<&Record> = cluster
            .members
            .iter()
            .map(|&i| &records[i])
            .collect();
        let path = dir.join(group_file_name(base_name, cluster.id));
        save_json(&members, &path)?;
        written.push(path);
    }

    let summary =
        SimilaritySummary::from_clustering(&detection.clustering, records, base_name, threshold);
    let path = dir.join(summary_file_name(base_name));
    save_json(&summary, &path)?;
    written.push(path);

    let report = AnalysisReport::new(
        records,
        &detection.clustering,
        detection
            .distribution
            .clone(),
        threshold,
    );
    let path = dir.join(report_file_name(base_name));
    save_json(&report, &path)?;
    written.push(path);

    Ok(written)
}

#[instrument(skip_all, fields(inputs = args.inputs.len()))]
pub fn run(
    args: FindArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let mut config = load_config()?;
    apply_find_overrides(&mut config, &args);
    config.validate()?;

    let records = load_corpus(&args.inputs)?;
    if !ctx.quiet
    {
        println!(
            "Loaded {} records from {} file(s)",
            records.len(),
            args.inputs
                .len()
        );
    }

    let detection = detect(&records, &config, ctx);
    let clustering = &detection.clustering;
    let threshold = config
        .similarity
        .threshold;

    info!(
        groups = clustering.clusters.len(),
        duplicates = clustering.total_duplicates(),
        comparisons = clustering.comparisons,
        speedup = clustering.speedup(),
        "clustering finished"
    );

    if !ctx.quiet
    {
        print_distribution(&detection.distribution, ctx);
        print_categories(&ErrorTypeAnalysis::from_records(&records));
    }

    if clustering
        .clusters
        .is_empty()
    {
        if !ctx.quiet
        {
            println!(
                "{}",
                ctx.paint(
                    &format!(
                        "No groups reach the {:.0}% similarity threshold; nothing written",
                        threshold * 100.0
                    ),
                    |s| s
                        .yellow()
                        .to_string()
                )
            );
        }
        return Ok(());
    }

    let dir = &config
        .output
        .dir;
    let base_name = &config
        .output
        .base_name;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", ctx.paint("DRY RUN: Would write:", |s| s.yellow().to_string()));
            for cluster in &clustering.clusters
            {
                println!("  {}", dir.join(group_file_name(base_name, cluster.id)).display());
            }
            println!("  {}", dir.join(summary_file_name(base_name)).display());
            println!("  {}", dir.join(report_file_name(base_name)).display());
        }
        return Ok(());
    }

    let written = write_outputs(&records, &detection, dir, base_name, threshold)?;

    if !ctx.quiet
    {
        println!(
            "{} Found {} groups with {} records ({} comparisons, {:.1}x fewer than all pairs)",
            ctx.paint("✓", |s| s
                .green()
                .to_string()),
            clustering
                .clusters
                .len(),
            clustering.total_duplicates(),
            clustering.comparisons,
            clustering.speedup()
        );
        println!("Wrote {} files to {}", written.len(), dir.display());
    }

    Ok(())
}

#[instrument(skip_all, fields(inputs = args.inputs.len()))]
pub fn analyze(
    args: AnalyzeArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let mut config = load_config()?;
    if let Some(n) = args.sample_size
    {
        config
            .sampling
            .sample_size = n;
    }
    if args
        .seed
        .is_some()
    {
        config
            .sampling
            .seed = args.seed;
    }
    config.validate()?;

    let records = load_corpus(&args.inputs)?;
    let scorer = SimilarityScorer::new(config.weights());
    let sampler = DistributionSampler::new(&scorer, config.sampling);

    let pb = progress(ctx, 0);
    let distribution = sampler.sample_with_progress(&records, &|done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    });
    pb.finish_and_clear();

    if args.json
    {
        println!(
            "{}",
            serde_json::to_string_pretty(&distribution).context("Failed to serialize statistics")?
        );
    }
    else if !ctx.quiet
    {
        print_distribution(&distribution, ctx);
    }

    Ok(())
}

fn apply_find_overrides(
    config: &mut Config,
    args: &FindArgs,
)
{
    if let Some(t) = args.threshold
    {
        config
            .similarity
            .threshold = t;
    }
    if args.parallel
    {
        config
            .clustering
            .parallel = true;
    }
    if let Some(mode) = args.mode
    {
        config
            .clustering
            .mode = mode.into();
    }
    if let Some(n) = args.sample_size
    {
        config
            .sampling
            .sample_size = n;
    }
    if args
        .seed
        .is_some()
    {
        config
            .sampling
            .seed = args.seed;
    }
    if let Some(dir) = &args.output_dir
    {
        config
            .output
            .dir = dir.clone();
    }
    if let Some(name) = &args.base_name
    {
        config
            .output
            .base_name = name.clone();
    }
}

fn progress(
    ctx: &AppContext,
    len: u64,
) -> ProgressBar
{
    if ctx.quiet
    {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

#[derive(Tabled)]
struct StatRow
{
    metric: &'static str,
    value: String,
}

#[derive(Tabled)]
struct PairRow
{
    uuid1: String,
    uuid2: String,
    similarity: String,
}

fn print_distribution(
    distribution: &Distribution,
    ctx: &AppContext,
)
{
    let Some(stats) = distribution.stats()
    else
    {
        println!(
            "{}",
            ctx.paint("Not enough records to sample similarities", |s| s
                .yellow()
                .to_string())
        );
        return;
    };

    let rows = vec![
        StatRow { metric: "sampled records", value: stats.sampled_records.to_string() },
        StatRow { metric: "comparisons", value: stats.total_comparisons.to_string() },
        StatRow { metric: "average", value: format!("{:.3}", stats.avg_similarity) },
        StatRow { metric: "max", value: format!("{:.3}", stats.max_similarity) },
        StatRow { metric: "min", value: format!("{:.3}", stats.min_similarity) },
        StatRow { metric: "> 0.90", value: stats.high_similarity_count.to_string() },
        StatRow { metric: "> 0.95", value: stats.very_high_similarity_count.to_string() },
        StatRow { metric: "> 0.99", value: stats.exact_duplicates.to_string() },
    ];
    println!("{}", Table::new(rows));

    if !stats
        .high_similarity_examples
        .is_empty()
    {
        let pairs: Vec<PairRow> = stats
            .high_similarity_examples
            .iter()
            .map(|p| PairRow {
                uuid1: p
                    .uuid1
                    .clone(),
                uuid2: p
                    .uuid2
                    .clone(),
                similarity: format!("{:.3}", p.similarity),
            })
            .collect();
        println!("{}", Table::new(pairs));
    }
}

#[derive(Tabled)]
struct CategoryRow
{
    category: String,
    records: usize,
}

fn category_rows(analysis: &ErrorTypeAnalysis) -> Vec<CategoryRow>
{
    analysis
        .most_common
        .iter()
        .map(|(name, count)| CategoryRow {
            category: if name.is_empty() { "(none)".to_string() } else { name.clone() },
            records: *count,
        })
        .collect()
}

fn print_categories(analysis: &ErrorTypeAnalysis)
{
    let rows = category_rows(analysis);
    if !rows.is_empty()
    {
        println!("{}", Table::new(rows));
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn corpus() -> Vec<Record>
    {
        let code = "int main() { int x = 1; return x; }";
        vec![
            Record::new("a", "syntax", "semi", code, "m.c:1:1: error: expected ';'"),
            Record::new("b", "syntax", "semi", code, "m.c:9:4: error: expected ';'"),
            Record::new("c", "type", "int", "float y;", "m.c:2:2: error: bad type"),
        ]
    }

    #[test]
    fn detect_then_write_produces_all_documents() -> Result<()>
    {
        let records = corpus();
        let ctx = AppContext { quiet: true, ..Default::default() };
        let detection = detect(&records, &Config::default(), &ctx);

        assert_eq!(
            detection
                .clustering
                .clusters
                .len(),
            1
        );

        let dir = tempfile::tempdir()?;
        let written = write_outputs(&records, &detection, dir.path(), "t", 0.9)?;
        let names: Vec<_> = written
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| {
                n.to_string_lossy()
                    .into_owned()
            })
            .collect();

        assert_eq!(
            names,
            vec!["t_similar_group_1.json", "t_similarity_summary.json", "t_analysis_report.json"]
        );
        Ok(())
    }

    #[test]
    fn category_table_lists_most_common_first()
    {
        let mut records = corpus();
        records.push(Record::new("d", "", "", "", ""));

        let rows = category_rows(&ErrorTypeAnalysis::from_records(&records));
        let cells: Vec<_> = rows
            .iter()
            .map(|r| (r.category.as_str(), r.records))
            .collect();

        assert_eq!(cells, vec![("syntax", 2), ("(none)", 1), ("type", 1)]);
        assert!(
            Table::new(rows)
                .to_string()
                .contains("syntax")
        );
    }

    #[test]
    fn summary_records_threshold_used() -> Result<()>
    {
        let records = corpus();
        let ctx = AppContext { quiet: true, ..Default::default() };
        let detection = detect(&records, &Config::default(), &ctx);

        let dir = tempfile::tempdir()?;
        write_outputs(&records, &detection, dir.path(), "t", 0.85)?;

        let summary: SimilaritySummary =
            crate::infra::io::load_json(&dir.path().join(summary_file_name("t")))?;
        assert_eq!(summary.similarity_threshold_used, Some(0.85));
        Ok(())
    }

    #[test]
    fn overrides_win_over_config()
    {
        let mut config = Config::default();
        let args = FindArgs {
            inputs: vec![],
            output_dir: Some(PathBuf::from("out")),
            threshold: Some(0.8),
            parallel: true,
            mode: Some(crate::cli::ModeArg::OnDemand),
            sample_size: Some(5),
            seed: Some(1),
            base_name: Some("x".into()),
        };

        apply_find_overrides(&mut config, &args);

        assert_eq!(config.similarity.threshold, 0.8);
        assert!(config.clustering.parallel);
        assert_eq!(config.sampling.sample_size, 5);
        assert_eq!(config.sampling.seed, Some(1));
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.output.base_name, "x");
    }
}
