//! `sample` command: write a uniform random subset of a corpus.

use std::path::{Path, PathBuf};

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::instrument;

use crate::cli::{AppContext, SampleArgs};
use crate::core::record::Record;
use crate::core::sampler::sample_indices;
use crate::infra::io::{load_records, save_json};

/// Pick up to `count` records uniformly; a small corpus comes back whole
pub fn subset(
    records: &[Record],
    count: usize,
    seed: Option<u64>,
) -> Vec<&Record>
{
    sample_indices(records.len(), count, seed)
        .into_iter()
        .map(|i| &records[i])
        .collect()
}

/// `<stem>_sample_<n>.json` next to `input`
pub fn default_output_path(
    input: &Path,
    count: usize,
) -> PathBuf
{
    let stem = input
        .file_stem()
        .map(|s| {
            s.to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default();

    input.with_file_name(format!("{stem}_sample_{count}.json"))
}

#[instrument(skip_all, fields(input = %args.input.display(), count = args.count))]
pub fn run(
    args: SampleArgs,
    ctx: &AppContext,
) -> Result<()>
{
    if args.count == 0
    {
        anyhow::bail!("--count must be at least 1");
    }

    let records = load_records(&args.input)?;
    let picked = subset(&records, args.count, args.seed);
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input, args.count));

    if records.len() < args.count && !ctx.quiet
    {
        println!(
            "{}",
            ctx.paint(
                &format!("Corpus has only {} records; keeping all of them", records.len()),
                |s| s
                    .yellow()
                    .to_string()
            )
        );
    }

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!(
                "{} {} records to {}",
                ctx.paint("DRY RUN: Would write", |s| s.yellow().to_string()),
                picked.len(),
                output.display()
            );
        }
        return Ok(());
    }

    save_json(&picked, &output)?;

    if !ctx.quiet
    {
        println!(
            "{} Sampled {} of {} records to {}",
            ctx.paint("✓", |s| s
                .green()
                .to_string()),
            picked.len(),
            records.len(),
            output.display()
        );
    }

    Ok(())
}
