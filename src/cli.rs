//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - CLI flags override config values (loaded from XML if present).
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use haul::config::{Config, LogLevel};

/// Copy or move files with interactive collision resolution.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Copy or move files with interactive collision resolution"
)]
pub struct Args {
    /// Source files or directories to transfer.
    #[arg(value_name = "SOURCE", value_hint = ValueHint::AnyPath,
          required_unless_present = "print_config")]
    pub sources: Vec<PathBuf>,

    /// Destination folder.
    #[arg(short = 't', long, value_name = "DIR", value_hint = ValueHint::DirPath,
          required_unless_present = "print_config")]
    pub dest: Option<PathBuf>,

    /// Move instead of copy (sources are removed after transfer).
    #[arg(long = "move")]
    pub move_sources: bool,

    /// Collision policy: ask, skip, overwrite, overwrite-if-older,
    /// overwrite-if-size-differs, resume, rename.
    #[arg(long, value_name = "ACTION")]
    pub on_collision: Option<String>,

    /// Transfer a single source under this name in the destination.
    #[arg(long, value_name = "NAME")]
    pub rename_to: Option<String>,

    /// Never prompt: collisions follow --on-collision (unresolved ones are
    /// skipped) and I/O errors abort.
    #[arg(long)]
    pub non_interactive: bool,

    /// Preserve timestamps (and Unix permission bits) on copies; slower.
    #[arg(long)]
    pub preserve_metadata: bool,

    /// Enable debug logging (shorthand for --log-level debug).
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Write logs to this file in addition to stdout.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON.
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print the config file location used by haul and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(file) = &self.log_file {
            cfg.log_file = Some(file.clone());
        }
        if self.preserve_metadata {
            cfg.preserve_metadata = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
