use anyhow::Result;
use clap::Parser;
use cedup::cli::{AppContext, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    cedup::init_tracing();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Find(args) => cedup::find_run(args, &ctx),
        Commands::Analyze(args) => cedup::analyze_run(args, &ctx),
        Commands::Dedupe(args) => cedup::dedupe_run(args, &ctx),
        Commands::Sample(args) => cedup::sample_run(args, &ctx),
        Commands::Init(args) => cedup::infra::config::init(args, &ctx),
        Commands::Completions(args) => cedup::completion::run(args, &ctx),
    }
}
