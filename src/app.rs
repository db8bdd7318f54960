//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler,
//! validates paths, builds the file set, and runs the transfer job.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use haul::config::{self, Config};
use haul::console::ConsoleDecider;
use haul::job::{
    CollisionAction, DecisionProvider, JobMonitor, PolicyDecider, TransferJob, TransferMode,
};
use haul::output as out;
use haul::vfs::LocalEntry;
use haul::TransferError;

use crate::cli::Args;
use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    if let Some(path) = config::ensure_default_config_exists() {
        out::print_info(&format!("Created a template config at {}", path.display()));
    }

    let mut cfg = config::load_config()?.unwrap_or_default();
    args.apply_overrides(&mut cfg);

    // Capture the guard so file logs are flushed when we return.
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {}", e));
            e
        })?;
    let guard_slot = Arc::new(Mutex::new(guard_opt));

    let monitor = Arc::new(JobMonitor::new());
    {
        let monitor = Arc::clone(&monitor);
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            monitor.request_cancel();
            out::print_warn("Received interrupt; finishing the current step...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .context("install signal handler")?;
    }

    let result = run_transfer(&args, &cfg, monitor);

    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn run_transfer(args: &Args, cfg: &Config, monitor: Arc<JobMonitor>) -> Result<()> {
    let dest_dir = args
        .dest
        .as_deref()
        .context("a destination folder is required")?;
    validate_destination(dest_dir)?;

    for source in &args.sources {
        if !source.exists() {
            error!(source = %source.display(), "source does not exist");
            bail!(TransferError::SourceNotFound(source.clone()));
        }
    }
    if args.rename_to.is_some() && args.sources.len() != 1 {
        bail!("--rename-to needs exactly one source");
    }

    let default_action = match args.on_collision.as_deref() {
        Some(s) => CollisionAction::parse(s)
            .with_context(|| format!("invalid collision action: '{s}'"))?,
        None => cfg.default_collision,
    };

    let (files, bytes) = scan_sources(args);
    let mode = if args.move_sources {
        TransferMode::Move
    } else {
        TransferMode::Copy
    };
    info!(files, bytes, mode = ?mode, dest = %dest_dir.display(), "starting transfer");

    let sources: Vec<LocalEntry> = args.sources.iter().map(LocalEntry::new).collect();
    let dest = LocalEntry::new(dest_dir);

    if args.non_interactive {
        let provider = PolicyDecider::new(default_action);
        execute(args, cfg, mode, sources, dest, default_action, provider, monitor)
    } else {
        let provider = ConsoleDecider::new();
        execute(args, cfg, mode, sources, dest, default_action, provider, monitor)
    }
}

#[allow(clippy::too_many_arguments)]
fn execute<P: DecisionProvider>(
    args: &Args,
    cfg: &Config,
    mode: TransferMode,
    sources: Vec<LocalEntry>,
    dest: LocalEntry,
    default_action: CollisionAction,
    provider: P,
    monitor: Arc<JobMonitor>,
) -> Result<()> {
    let mut job = TransferJob::new(mode, sources, dest, provider, monitor)
        .with_rename_to(args.rename_to.clone())
        .with_default_action(default_action)
        .with_preserve_metadata(cfg.preserve_metadata);

    match job.run() {
        Ok(stats) => {
            let elapsed = job.monitor().active_elapsed();
            out::print_success(&format!(
                "Transferred {} file(s), {} byte(s) in {:.1?}; {} skipped",
                stats.files_transferred, stats.bytes_transferred, elapsed, stats.files_skipped
            ));
            Ok(())
        }
        Err(e @ TransferError::Interrupted) => {
            out::print_warn("Transfer aborted");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "transfer failed");
            Err(e.into())
        }
    }
}

/// Count files and bytes up front so the start log line can say what is
/// ahead. Best-effort; unreadable entries are ignored here and surface
/// later through the job itself.
fn scan_sources(args: &Args) -> (u64, u64) {
    let mut files = 0u64;
    let mut bytes = 0u64;
    for source in &args.sources {
        for entry in WalkDir::new(source).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() {
                files += 1;
                bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }
    debug!(files, bytes, "pre-scan complete");
    (files, bytes)
}

fn validate_destination(dest: &Path) -> Result<()> {
    if dest.exists() && !dest.is_dir() {
        bail!(TransferError::DestinationUnusable {
            path: dest.to_path_buf(),
            reason: "exists but is not a directory".to_string(),
        });
    }
    std::fs::create_dir_all(dest)
        .with_context(|| format!("create destination directory '{}'", dest.display()))?;
    Ok(())
}

fn print_config_location() {
    if let Ok(cfg_env) = std::env::var("HAUL_CONFIG") {
        out::print_info(&format!("Using HAUL_CONFIG (explicit):\n  {}\n", cfg_env));
        out::print_info("To override, unset HAUL_CONFIG or set it to another file.");
        return;
    }
    match config::default_config_path() {
        Some(p) => {
            out::print_info(&format!("Default haul config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet; one is created on first run.");
            }
        }
        None => out::print_error("Could not determine a default config path."),
    }
}
