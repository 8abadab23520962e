use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use monorelease::config::load_config;
use monorelease::git_ops::{resolve_workspace_root, GitRepo};
use monorelease::manifest::Workspace;
use monorelease::release::{Orchestrator, ReleaseOptions, ReleaseState, RunMode};
use monorelease::runner::SystemRunner;
use monorelease::ui::{self, AssumeYes, Prompter, TerminalPrompter};

#[derive(clap::Parser)]
#[command(
    name = "monorelease",
    version,
    about = "Bump, commit, publish and tag every package of a JavaScript monorepo"
)]
struct Args {
    #[arg(value_name = "VERSION", help = "Target version; prompts when omitted")]
    target_version: Option<String>,

    #[arg(long, value_name = "ID", help = "Pre-release identifier (alpha, beta, rc, ...)")]
    preid: Option<String>,

    #[arg(long, help = "Log every mutating action instead of running it")]
    dry: bool,

    #[arg(long = "skipTests", help = "Do not run the configured test command")]
    skip_tests: bool,

    #[arg(long = "skipBuild", help = "Do not run the configured build command")]
    skip_build: bool,

    #[arg(long, value_name = "NAME", help = "Dist-tag to publish under")]
    tag: Option<String>,

    #[arg(long, value_name = "PKG", help = "Package to leave unpublished (repeatable)")]
    skip: Vec<String>,

    #[arg(short, long, help = "Skip the confirmation prompt")]
    yes: bool,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Workspace root (defaults to the git work tree)")]
    root: Option<PathBuf>,

    #[arg(short, long, help = "Print debug diagnostics")]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("monorelease=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let root = resolve_workspace_root(args.root.as_deref(), &cwd);
    debug!(root = %root.display(), "workspace root");

    let config = load_config(args.config.as_deref(), &root)?;
    let mut workspace = Workspace::load(&root, &config.packages_dir)
        .with_context(|| format!("Failed to load workspace at {}", root.display()))?;

    if let Some(branch) = GitRepo::discover(&root).and_then(|repo| repo.current_branch()) {
        ui::display_status(&format!("Releasing from branch '{}'", branch));
    }

    let options = ReleaseOptions {
        version: args.target_version,
        preid: args.preid,
        mode: RunMode::from_dry_flag(args.dry),
        skip_build: args.skip_build,
        skip_tests: args.skip_tests,
        tag: args.tag,
        skip: args.skip,
    };

    let prompter: Box<dyn Prompter> = if args.yes {
        Box::new(AssumeYes::new(TerminalPrompter::new()))
    } else {
        Box::new(TerminalPrompter::new())
    };
    let runner = SystemRunner;

    let mut orchestrator = Orchestrator::new(&config, &runner, prompter.as_ref(), options);
    let report = orchestrator.run(&mut workspace)?;
    if report.state == ReleaseState::Aborted {
        debug!("release declined at confirmation");
    }
    Ok(())
}
