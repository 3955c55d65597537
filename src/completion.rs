//! `cedup completions`: shell completion scripts for the cedup CLI.
//!
//! Scripts cover every subcommand (`find`, `analyze`, `dedupe`, `sample`,
//! `init`) and their flags.

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate, generate_to};
use std::{fs, io::Write, path::Path};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};

/// Binary name baked into generated scripts
pub const BIN_NAME: &str = "cedup";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Render the completion script for `shell` into memory
pub fn script(shell: Shell) -> Vec<u8> {
    let mut buf = Vec::new();
    generate(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, &mut buf);
    buf
}

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    if args.stdout {
        std::io::stdout()
            .lock()
            .write_all(&script(args.shell))
            .context("write completion to stdout")?;
        return Ok(());
    }

    let Some(dir) = args.out_dir else {
        bail!("--out-dir is required unless --stdout is set");
    };
    write_into(args.shell, &dir, ctx)
}

fn write_into(shell: Shell, dir: &Path, ctx: &AppContext) -> Result<()> {
    let shell = CompletionShell::from(shell);

    if ctx.dry_run {
        if !ctx.quiet {
            println!("DRY RUN: would write {shell} completion for {BIN_NAME} into {}", dir.display());
        }
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("create completion directory {}", dir.display()))?;
    let path = generate_to(shell, &mut Cli::command(), BIN_NAME, dir)
        .context("generate completion file")?;

    if !ctx.quiet {
        eprintln!("Wrote {shell} completion to {}", path.display());
    }
    Ok(())
}
