//! Post-mutation archive optimization.
//!
//! After a job has written into a writable archive container, the container
//! is repacked once to reclaim space. Failures follow the same discipline as
//! destination creation: present a retryable error naming the archive, retry
//! for as long as the operator insists, otherwise give up on that archive
//! without touching files already written into it.

use std::io;

use tracing::{info, warn};

use crate::job::decision::{DecisionProvider, RetryChoice};
use crate::job::state::JobMonitor;

/// A writable archive container that can consolidate itself after mutation.
/// Container parsing lives in the archive codec layer, not here.
pub trait RwArchive {
    fn name(&self) -> String;
    fn optimize(&mut self) -> io::Result<()>;
}

/// Optimize one archive, retrying under operator control.
///
/// While the repack runs, the monitor's optimizing flag is set so progress
/// reporting can distinguish this phase from file transfer. Returns whether
/// the optimization completed.
pub fn optimize_archive<P: DecisionProvider>(
    monitor: &JobMonitor,
    provider: &mut P,
    archive: &mut dyn RwArchive,
    error_title: &str,
) -> bool {
    monitor.set_optimizing(true);

    let completed = loop {
        match archive.optimize() {
            Ok(()) => {
                info!(archive = %archive.name(), "archive optimized");
                break true;
            }
            Err(e) => {
                warn!(archive = %archive.name(), error = %e, "archive optimization failed");
                let message = format!("Error while optimizing archive {}: {e}", archive.name());
                match provider.ask_retry_on_error(error_title, &message) {
                    RetryChoice::Retry => continue,
                    RetryChoice::Abort => break false,
                }
            }
        }
    };

    monitor.set_optimizing(false);
    completed
}
