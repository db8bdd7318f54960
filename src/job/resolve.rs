//! Destination resolution: handle creation with operator-driven retry, and
//! the collision resolution loop.
//!
//! The loop is the heart of the engine. It keeps classifying and asking
//! until it reaches one of the terminal outcomes; it is deliberately
//! unbounded, stopped only by an operator answer. Every suspension point
//! checks the monitor first so a pending cancel wins over another prompt.

use tracing::{debug, warn};

use crate::job::collision::{CollisionKind, case_only_variation, classify};
use crate::job::decision::{
    CollisionAction, CollisionPrompt, DecisionProvider, FileFacts, RetryChoice,
};
use crate::job::state::{JobMonitor, ResolutionContext};
use crate::vfs::VfsEntry;

/// Terminal result of resolving one file.
///
/// The destination handle is present exactly on the `Proceed*` variants;
/// callers must not attempt a transfer otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome<F> {
    /// Transfer into the destination, truncating any existing content.
    ProceedFresh(F),
    /// Append to the existing destination (operator chose Resume).
    ProceedAppend(F),
    /// Transfer under a caller-requested different name.
    ProceedRenamed(F),
    /// Leave this file alone and continue with the next one.
    AbandonFile,
    /// Stop the whole job; no further files may be resolved.
    AbortJob,
}

impl<F> ResolutionOutcome<F> {
    /// The resolved destination, when one exists.
    pub fn destination(&self) -> Option<&F> {
        match self {
            ResolutionOutcome::ProceedFresh(d)
            | ResolutionOutcome::ProceedAppend(d)
            | ResolutionOutcome::ProceedRenamed(d) => Some(d),
            ResolutionOutcome::AbandonFile | ResolutionOutcome::AbortJob => None,
        }
    }
}

/// Obtain a destination handle for `dest_name` inside `dest_folder`.
///
/// I/O failures are presented as retryable errors naming the file; Retry
/// loops forever, any other answer yields `None`. Blocking: the job thread
/// suspends until the operator responds.
pub fn create_destination<F, P>(
    provider: &mut P,
    dest_folder: &F,
    dest_name: &str,
    error_title: &str,
) -> Option<F>
where
    F: VfsEntry,
    P: DecisionProvider,
{
    loop {
        match dest_folder.child(dest_name) {
            Ok(dest) => return Some(dest),
            Err(e) => {
                warn!(name = dest_name, error = %e, "cannot obtain destination handle");
                let message = format!("Cannot write file {dest_name}: {e}");
                match provider.ask_retry_on_error(error_title, &message) {
                    RetryChoice::Retry => continue,
                    RetryChoice::Abort => return None,
                }
            }
        }
    }
}

/// Run the resolution loop for one (source, destination) pair.
///
/// `allow_case_variation` tolerates a destination that is the source under a
/// different letter case (renaming `Foo` to `foo` on a case-insensitive
/// filesystem): the would-be same-file collision is treated as none.
#[allow(clippy::too_many_arguments)]
pub fn resolve_collision<F, P>(
    ctx: &mut ResolutionContext,
    monitor: &JobMonitor,
    provider: &mut P,
    source: &F,
    dest_folder: &F,
    mut destination: F,
    allow_case_variation: bool,
    error_title: &str,
) -> ResolutionOutcome<F>
where
    F: VfsEntry,
    P: DecisionProvider,
{
    ctx.append = false;

    loop {
        if monitor.is_cancelled() {
            return ResolutionOutcome::AbortJob;
        }

        // Re-classify on every pass: a rename may collide again, and the
        // backend may have changed under us between retries.
        let mut kind = classify(Some(source), &destination);
        if allow_case_variation
            && kind == CollisionKind::SameSourceAndDestination
            && case_only_variation(&source.name(), &destination.name())
        {
            kind = CollisionKind::NoCollision;
        }

        if kind == CollisionKind::NoCollision {
            return ResolutionOutcome::ProceedFresh(destination);
        }

        // Use the recorded default when one is set; otherwise ask, and
        // persist the answer when the operator said "apply to all".
        let action = if ctx.default_action == CollisionAction::Ask {
            let prompt = CollisionPrompt {
                kind,
                source: FileFacts::of(source),
                destination: FileFacts::of(&destination),
                allow_rename: true,
                allow_apply_to_all: true,
            };
            let verdict = provider.ask_collision(&prompt);
            if verdict.apply_to_all && verdict.action != CollisionAction::Ask {
                debug!(action = %verdict.action, "recording default collision action");
                ctx.default_action = verdict.action;
            }
            verdict.action
        } else {
            ctx.default_action
        };

        match action {
            CollisionAction::Cancel | CollisionAction::Dismissed | CollisionAction::Ask => {
                monitor.request_cancel();
                return ResolutionOutcome::AbortJob;
            }
            CollisionAction::Skip => return ResolutionOutcome::AbandonFile,
            CollisionAction::Resume => {
                ctx.append = true;
                return ResolutionOutcome::ProceedAppend(destination);
            }
            CollisionAction::Overwrite => return ResolutionOutcome::ProceedFresh(destination),
            CollisionAction::OverwriteIfOlder => {
                // Strictly newer only; equal timestamps do not overwrite.
                if source.modified_ms() <= destination.modified_ms() {
                    return ResolutionOutcome::AbandonFile;
                }
                return ResolutionOutcome::ProceedFresh(destination);
            }
            CollisionAction::OverwriteIfSizeDiffers => {
                if source.size() == destination.size() {
                    return ResolutionOutcome::AbandonFile;
                }
                return ResolutionOutcome::ProceedFresh(destination);
            }
            CollisionAction::Rename => {
                // The wait for a name must not skew elapsed-time stats.
                monitor.set_paused(true);
                let reply = provider.ask_rename_target(&destination.name());
                monitor.set_paused(false);

                match reply.filter(|name| !name.is_empty()) {
                    Some(new_name) => {
                        match create_destination(provider, dest_folder, &new_name, error_title) {
                            Some(renamed) => destination = renamed,
                            None => {
                                monitor.request_cancel();
                                return ResolutionOutcome::AbortJob;
                            }
                        }
                    }
                    None => {
                        // A default of Rename with no name would loop forever;
                        // fall back to asking again.
                        ctx.default_action = CollisionAction::Ask;
                    }
                }
            }
        }
    }
}
