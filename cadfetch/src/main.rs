//! Retry-and-resume batch fetcher.
//!
//! Runs the configured download tool once per identifier in the input file,
//! retries transient failures across passes, and leaves `pending.txt` with
//! whatever is still unresolved.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cadfetch::cancel::{InterruptFlag, StopFlagFile};
use cadfetch::core::types::AttemptOutcome;
use cadfetch::exit_codes;
use cadfetch::io::config::{DEFAULT_CONFIG_FILE, FetchConfig, load_config, write_config};
use cadfetch::io::fetch::CommandFetcher;
use cadfetch::io::layout::RunPaths;
use cadfetch::logging;
use cadfetch::pass::ItemProgress;
use cadfetch::run::{execute_run, rebuild_pending};
use cadfetch::shutdown::register_interrupt_flag;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cadfetch",
    version,
    about = "Batch fetcher with bounded retries and resumable pending lists"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every identifier in the input file, retrying transient failures.
    Run(RunArgs),
    /// Rebuild the pending list from the last telemetry dump.
    Report(RunArgs),
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file (defaults apply when it does not exist).
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Input file, overriding `paths.input_file`.
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = env::current_dir().context("resolve working directory")?;
    match cli.command {
        Command::Run(args) => cmd_run(&root, &args),
        Command::Report(args) => cmd_report(&root, &args),
        Command::Init { force } => cmd_init(&root, force),
    }
}

fn resolve(root: &Path, args: &RunArgs) -> Result<(FetchConfig, RunPaths)> {
    let config = load_config(&root.join(&args.config))?;
    let mut paths = RunPaths::resolve(root, &config.paths);
    if let Some(input) = &args.input {
        paths = paths.with_input(input);
    }
    Ok((config, paths))
}

fn cmd_run(root: &Path, args: &RunArgs) -> Result<i32> {
    let (config, paths) = resolve(root, args)?;

    let interrupt = InterruptFlag::new();
    register_interrupt_flag(&interrupt)?;
    let cancel = (interrupt, StopFlagFile::new(&paths.stop_flag_path));

    let fetcher = CommandFetcher::new(&config.command);
    let report = execute_run(&paths, &config, fetcher, &cancel, print_progress)?;

    println!("{report}");
    if report.interrupted() {
        return Ok(exit_codes::INTERRUPTED);
    }
    Ok(exit_codes::OK)
}

fn cmd_report(root: &Path, args: &RunArgs) -> Result<i32> {
    let (_, paths) = resolve(root, args)?;
    let partition = rebuild_pending(&paths)?;
    println!("fetched:    {}", partition.success.len());
    println!("not found:  {}", partition.not_found.len());
    println!(
        "pending:    {} ({} distinct)",
        partition.pending.len(),
        partition.pending_distinct()
    );
    println!("pending list: {}", paths.pending_path.display());
    Ok(exit_codes::OK)
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let path = root.join(DEFAULT_CONFIG_FILE);
    if !force && path.exists() {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(&path, &FetchConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn print_progress(progress: &ItemProgress<'_>) {
    let status = match progress.outcome {
        AttemptOutcome::Success {
            artifact_path,
            size_bytes,
        } => format!("saved {} ({size_bytes} bytes)", artifact_path.display()),
        AttemptOutcome::NotFound => "not found".to_string(),
        AttemptOutcome::Retryable { .. } => "retry".to_string(),
    };
    println!(
        "[pass {}] {}/{} {}: {status}",
        progress.pass, progress.index, progress.total, progress.identifier
    );
}
