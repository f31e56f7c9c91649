//! kvsnap - Snapshot and restore the key space of a Redis-compatible store.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};

use clap::Parser;
use console::style;
use tracing::{debug, info};

use kvsnap::cli::{BackupArgs, Cli, Commands, CompletionsArgs, RestoreArgs};
use kvsnap::config::{expand_home, load_config};
use kvsnap::engine::{read_header, BackupEngine, BackupOptions, RestoreEngine};
use kvsnap::error::{Result, ResultExt, SnapError};
use kvsnap::logging;
use kvsnap::output::{OutputMode, RobotOutput};
use kvsnap::store::RedisStore;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> bool {
        option_env!("VERGEN_GIT_DIRTY") == Some("true")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too and are not failures.
            let code = i32::from(e.use_stderr());
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);
    let mode = OutputMode::from_cli(&cli);

    if let Err(e) = run(&cli, mode) {
        output_error(mode, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, mode: OutputMode) -> Result<()> {
    match &cli.command {
        Commands::Backup(args) => cmd_backup(mode, args),
        Commands::Restore(args) => cmd_restore(mode, args),
        Commands::Version => {
            cmd_version(mode);
            Ok(())
        }
        Commands::Completions(args) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

// === Backup & Restore ===

fn cmd_backup(mode: OutputMode, args: &BackupArgs) -> Result<()> {
    let config = load_config(expand_home(&args.config)?)?;
    let store_config = config.store_config()?;
    let mut store = RedisStore::connect(&store_config)?;

    let output = expand_home(&args.output)?;
    let file = File::create(&output)
        .with_context(|| format!("Cannot create snapshot file {}", output.display()))?;
    info!(path = %output.display(), "Writing snapshot");

    let options = BackupOptions::new(config.store_section()).sorted(!args.not_sorted);
    let mut emitter = mode.emitter();
    let report = BackupEngine::new(&mut store, emitter.as_mut()).run(file, &options)?;

    if let OutputMode::Robot(_) = mode {
        RobotOutput::finish(&report);
    }
    Ok(())
}

fn cmd_restore(mode: OutputMode, args: &RestoreArgs) -> Result<()> {
    let config = load_config(expand_home(&args.config)?)?;
    let store_config = config.store_config()?;

    let input = expand_home(&args.input)?;
    let file = File::open(&input)
        .with_context(|| format!("Cannot open snapshot file {}", input.display()))?;
    let mut reader = BufReader::new(file);
    let mut emitter = mode.emitter();

    // A bad header must abort before the store is contacted.
    let (header, mut first) = read_header(&mut reader, emitter.as_mut())?;
    debug!(timestamp = %header.timestamp, sorted = header.sorted, "Snapshot header ok");
    first.push(b'\n');

    let mut store = RedisStore::connect(&store_config)?;
    let replay = Cursor::new(first).chain(reader);
    let report = RestoreEngine::new(&mut store, emitter.as_mut()).run(replay, args.options())?;

    if let OutputMode::Robot(_) = mode {
        RobotOutput::finish(&report);
    }
    Ok(())
}

// === Utilities ===

fn cmd_version(mode: OutputMode) {
    if let OutputMode::Robot(format) = mode {
        RobotOutput::new(format).report(&serde_json::json!({
            "version": build_info::VERSION,
            "git_sha": build_info::git_sha(),
            "git_dirty": build_info::git_dirty(),
            "build_timestamp": build_info::build_timestamp(),
            "rustc_version": build_info::rustc_semver(),
            "target": build_info::target(),
        }));
    } else {
        println!("kvsnap {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() { " (dirty)" } else { "" }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
}

fn cmd_completions(args: &CompletionsArgs) {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "kvsnap", &mut io::stdout());
}

fn output_error(mode: OutputMode, error: &SnapError) {
    match mode {
        OutputMode::Robot(_) => RobotOutput::error(error),
        // Header rejections were already reported line by line.
        OutputMode::Human { .. } if matches!(error, SnapError::FatalConfig(_)) => {}
        OutputMode::Human { .. } => {
            eprintln!("{}: {}", style("Error").red().bold(), error);
            if let Some(suggestion) = error.suggestion() {
                eprintln!("{}: {}", style("Hint").yellow(), suggestion);
            }
        }
    }
}
