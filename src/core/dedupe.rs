//! `dedupe` command: apply a similarity summary to a corpus.
//!
//! The first uuid of every group is kept and the remaining members are
//! dropped. Matching is by uuid, so every record carrying a dropped uuid
//! goes, and record order is otherwise preserved.

use std::path::{Path, PathBuf};

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::{debug, info, instrument};

use crate::cli::{AppContext, DedupeArgs};
use crate::core::record::Record;
use crate::core::report::{DedupeReport, SimilaritySummary};
use crate::infra::config::load_config;
use crate::infra::io::{InputError, load_json, load_records, save_json};

/// Records left after dropping duplicates, plus how many were dropped
pub fn deduplicate(
    records: Vec<Record>,
    summary: &SimilaritySummary,
) -> (Vec<Record>, usize)
{
    let remove = summary.ids_to_remove();
    let before = records.len();

    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| {
            let drop = remove.contains(r.id.as_str());
            if drop
            {
                debug!(uuid = %r.id, "dropping duplicate");
            }
            !drop
        })
        .collect();

    let removed = before - kept.len();
    (kept, removed)
}

/// `<stem><suffix>.<ext>` next to `input`
pub fn default_output_path(
    input: &Path,
    suffix: &str,
) -> PathBuf
{
    let stem = input
        .file_stem()
        .map(|s| {
            s.to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".json".to_string());

    input.with_file_name(format!("{stem}{suffix}{ext}"))
}

/// `<output stem>_deduplication_report.json` next to `output`
pub fn report_path(output: &Path) -> PathBuf
{
    let stem = output
        .file_stem()
        .map(|s| {
            s.to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default();

    output.with_file_name(format!("{stem}_deduplication_report.json"))
}

/// Load a summary, reporting shape problems as [`InputError::MalformedSummary`]
pub fn load_summary(path: &Path) -> Result<SimilaritySummary>
{
    load_json(path).map_err(|err| match err.downcast::<InputError>()
    {
        Ok(InputError::InvalidJson { source, .. }) => InputError::MalformedSummary {
            path: path.to_path_buf(),
            reason: source.to_string(),
        }
        .into(),
        Ok(other) => other.into(),
        Err(err) => err,
    })
}

#[instrument(skip_all, fields(input = %args.input.display()))]
pub fn run(
    args: DedupeArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    config.validate()?;

    let suffix = args
        .suffix
        .unwrap_or(config.dedupe.suffix);
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input, &suffix));

    let records = load_records(&args.input)?;
    let summary = load_summary(&args.summary)?;
    info!(
        groups = summary.total_groups,
        duplicates = summary.total_duplicates,
        "summary loaded"
    );

    let original_count = records.len();
    let (kept, removed) = deduplicate(records, &summary);
    let report = DedupeReport::new(
        original_count,
        kept.len(),
        &summary,
        config
            .similarity
            .threshold,
    );
    let report_file = report_path(&output);

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", ctx.paint("DRY RUN: Would write:", |s| s.yellow().to_string()));
            println!("  {} ({} records)", output.display(), kept.len());
            println!("  {}", report_file.display());
        }
        return Ok(());
    }

    save_json(&kept, &output)?;
    save_json(&report, &report_file)?;

    if !ctx.quiet
    {
        println!(
            "{} Kept {} of {} records, removed {} ({:.2}%)",
            ctx.paint("✓", |s| s
                .green()
                .to_string()),
            kept.len(),
            original_count,
            removed,
            report
                .deduplication_summary
                .deduplication_rate
        );
        println!("  data:   {}", output.display());
        println!("  report: {}", report_file.display());
    }

    Ok(())
}
