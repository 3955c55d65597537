use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::cluster::ClusterMode;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

impl AppContext {
    /// Apply `style` unless colors are disabled
    pub fn paint<F>(&self, text: &str, style: F) -> String
    where
        F: Fn(&str) -> String,
    {
        if self.no_color {
            text.to_string()
        } else {
            style(text)
        }
    }
}

#[derive(Parser)]
#[command(name = "cedup")]
#[command(
    about = "Find and remove near-duplicate (code, compiler error) examples in training corpora"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing files
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster near-duplicate records and write group files plus reports
    Find(FindArgs),

    /// Sample the similarity distribution without clustering
    Analyze(AnalyzeArgs),

    /// Drop duplicates listed in a similarity summary, keeping one per group
    Dedupe(DedupeArgs),

    /// Write a uniform random subset of a corpus
    Sample(SampleArgs),

    /// Initialize a cedup.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Clustering strategy as spelled on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Full similarity matrix per bucket
    Matrix,
    /// Score only the pairs the seed scan reads
    OnDemand,
}

impl From<ModeArg> for ClusterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Matrix => ClusterMode::Matrix,
            ModeArg::OnDemand => ClusterMode::OnDemand,
        }
    }
}

#[derive(Debug, Parser)]
pub struct FindArgs {
    /// Corpus files, each a JSON array of records
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory for group files and reports
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Similarity threshold in [0, 1]
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Cluster buckets on all cores
    #[arg(long)]
    pub parallel: bool,

    /// How bucket similarities are computed
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Records drawn for the distribution estimate
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Seed for repeatable sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prefix of every written file
    #[arg(long)]
    pub base_name: Option<String>,
}

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Corpus files, each a JSON array of records
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Records drawn for the distribution estimate
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Seed for repeatable sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Emit the statistics as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct DedupeArgs {
    /// Corpus file to deduplicate
    pub input: PathBuf,

    /// Similarity summary written by `find`
    #[arg(short, long)]
    pub summary: PathBuf,

    /// Output file (default: <input stem><suffix>.json beside the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suffix for the default output name
    #[arg(long)]
    pub suffix: Option<String>,
}

#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Corpus file to sample from
    pub input: PathBuf,

    /// Number of records to keep
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    /// Output file (default: <input stem>_sample_<n>.json beside the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed for repeatable sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; required unless --stdout is set
    #[arg(long, conflicts_with = "stdout")]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn find_parses_overrides() {
        let cli = Cli::try_parse_from([
            "cedup", "find", "a.json", "b.json", "-t", "0.85", "--mode", "on-demand", "--parallel",
            "--seed", "3", "--quiet",
        ])
        .unwrap();

        assert!(cli.quiet);
        match cli.command {
            Commands::Find(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.threshold, Some(0.85));
                assert_eq!(args.mode, Some(ModeArg::OnDemand));
                assert_eq!(ClusterMode::from(ModeArg::OnDemand), ClusterMode::OnDemand);
                assert!(args.parallel);
                assert_eq!(args.seed, Some(3));
            }
            _ => panic!("expected find"),
        }
    }

    #[test]
    fn find_requires_input() {
        assert!(Cli::try_parse_from(["cedup", "find"]).is_err());
    }

    #[test]
    fn dedupe_requires_summary() {
        assert!(Cli::try_parse_from(["cedup", "dedupe", "in.json"]).is_err());
        assert!(Cli::try_parse_from(["cedup", "dedupe", "in.json", "-s", "sum.json"]).is_ok());
    }

    #[test]
    fn sample_defaults_to_one_hundred() {
        let cli = Cli::try_parse_from(["cedup", "sample", "in.json"]).unwrap();
        match cli.command {
            Commands::Sample(args) => assert_eq!(args.count, 100),
            _ => panic!("expected sample"),
        }
    }

    #[test]
    fn paint_respects_no_color() {
        let ctx = AppContext { no_color: true, ..Default::default() };
        assert_eq!(ctx.paint("ok", |s| format!("<{s}>")), "ok");

        let ctx = AppContext::default();
        assert_eq!(ctx.paint("ok", |s| format!("<{s}>")), "<ok>");
    }
}
