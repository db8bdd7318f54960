//! Operator decisions.
//!
//! The engine never talks to a UI directly; every question goes through a
//! [`DecisionProvider`]. Implementations block until an answer is available —
//! the calling job thread suspends for as long as the operator takes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::job::collision::CollisionKind;
use crate::utils::next_candidate_name;
use crate::vfs::VfsEntry;

/// What to do about a collision. `Ask` is the sentinel for "no default set";
/// it is never a valid answer from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionAction {
    Ask,
    Cancel,
    Skip,
    Resume,
    Overwrite,
    OverwriteIfOlder,
    OverwriteIfSizeDiffers,
    Rename,
    /// The decision surface was dismissed without choosing.
    Dismissed,
}

impl CollisionAction {
    /// Parse common policy names (case-insensitive). Used by CLI and config.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ask" => Some(CollisionAction::Ask),
            "cancel" => Some(CollisionAction::Cancel),
            "skip" => Some(CollisionAction::Skip),
            "resume" | "append" => Some(CollisionAction::Resume),
            "overwrite" => Some(CollisionAction::Overwrite),
            "overwrite-if-older" | "newer" => Some(CollisionAction::OverwriteIfOlder),
            "overwrite-if-size-differs" | "size-differs" => {
                Some(CollisionAction::OverwriteIfSizeDiffers)
            }
            "rename" => Some(CollisionAction::Rename),
            _ => None,
        }
    }
}

impl fmt::Display for CollisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollisionAction::Ask => "ask",
            CollisionAction::Cancel => "cancel",
            CollisionAction::Skip => "skip",
            CollisionAction::Resume => "resume",
            CollisionAction::Overwrite => "overwrite",
            CollisionAction::OverwriteIfOlder => "overwrite-if-older",
            CollisionAction::OverwriteIfSizeDiffers => "overwrite-if-size-differs",
            CollisionAction::Rename => "rename",
            CollisionAction::Dismissed => "dismissed",
        };
        f.write_str(s)
    }
}

impl FromStr for CollisionAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid collision action: '{s}'"))
    }
}

/// A provider's answer to a collision, plus whether it should become the
/// job-wide default.
#[derive(Debug, Clone, Copy)]
pub struct CollisionVerdict {
    pub action: CollisionAction,
    pub apply_to_all: bool,
}

impl CollisionVerdict {
    pub fn once(action: CollisionAction) -> Self {
        Self { action, apply_to_all: false }
    }

    pub fn for_all(action: CollisionAction) -> Self {
        Self { action, apply_to_all: true }
    }
}

/// Answer to a retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryChoice {
    Retry,
    Abort,
}

/// Snapshot of one side of a collision, detached from the backend so
/// providers stay independent of the VFS type.
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified_ms: i64,
    pub is_dir: bool,
}

impl FileFacts {
    pub fn of<F: VfsEntry>(entry: &F) -> Self {
        Self {
            name: entry.name(),
            path: entry.path(),
            size: entry.size(),
            modified_ms: entry.modified_ms(),
            is_dir: entry.is_dir(),
        }
    }
}

/// Everything a decision surface needs to present a collision.
#[derive(Debug, Clone)]
pub struct CollisionPrompt {
    pub kind: CollisionKind,
    pub source: FileFacts,
    pub destination: FileFacts,
    pub allow_rename: bool,
    pub allow_apply_to_all: bool,
}

/// The decision surface consumed by the engine. All calls block the job
/// thread until the operator responds; there is no timeout.
pub trait DecisionProvider {
    /// Present a collision and return the chosen action.
    fn ask_collision(&mut self, prompt: &CollisionPrompt) -> CollisionVerdict;

    /// Ask for a new destination name, seeded from the current one.
    /// `None` means the prompt was cancelled.
    fn ask_rename_target(&mut self, current_name: &str) -> Option<String>;

    /// Present a retryable error. The message names the file or archive.
    fn ask_retry_on_error(&mut self, title: &str, message: &str) -> RetryChoice;
}

/// Non-interactive provider applying one fixed policy.
///
/// `Ask` degrades to `Skip` (with a warning) since there is nobody to ask;
/// rename prompts auto-answer with the next " (n)" candidate; errors abort.
#[derive(Debug, Clone, Copy)]
pub struct PolicyDecider {
    action: CollisionAction,
}

impl PolicyDecider {
    pub fn new(action: CollisionAction) -> Self {
        Self { action }
    }
}

impl DecisionProvider for PolicyDecider {
    fn ask_collision(&mut self, prompt: &CollisionPrompt) -> CollisionVerdict {
        if self.action == CollisionAction::Ask {
            warn!(destination = %prompt.destination.path.display(), kind = %prompt.kind,
                "no collision policy configured, skipping");
            return CollisionVerdict::once(CollisionAction::Skip);
        }
        CollisionVerdict::once(self.action)
    }

    fn ask_rename_target(&mut self, current_name: &str) -> Option<String> {
        Some(next_candidate_name(current_name))
    }

    fn ask_retry_on_error(&mut self, title: &str, message: &str) -> RetryChoice {
        warn!(title, message, "unattended transfer cannot retry, aborting");
        RetryChoice::Abort
    }
}
