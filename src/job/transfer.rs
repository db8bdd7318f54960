//! The transfer job: per-file iteration, directory recursion, byte transfer
//! and end-of-job archive optimization.
//!
//! One worker thread per job. Jobs own their file set and context and share
//! nothing with other jobs; the only cross-thread surface is the
//! [`JobMonitor`]. Cancellation is cooperative and checked at the top of the
//! per-file loop and at every suspension point.

use std::io::{self, BufReader, BufWriter, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::TransferError;
use crate::job::archive::{RwArchive, optimize_archive};
use crate::job::decision::{CollisionAction, DecisionProvider, RetryChoice};
use crate::job::resolve::{ResolutionOutcome, create_destination, resolve_collision};
use crate::job::state::{JobMonitor, ResolutionContext};
use crate::vfs::{FileOp, VfsEntry};

const COPY_BUF_SIZE: usize = 1024 * 1024; // 1 MiB buffers

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    /// Copy then remove the source; a rename fast path is attempted first.
    Move,
}

/// Progress counters, readable after (or during) a run.
#[derive(Debug, Default, Clone)]
pub struct TransferStats {
    pub files_transferred: u64,
    /// Skipped explicitly or via a conditional overwrite that did not apply.
    pub files_skipped: u64,
    pub directories_created: u64,
    pub bytes_transferred: u64,
}

/// A copy or move of an ordered set of sources into a destination folder.
pub struct TransferJob<F: VfsEntry, P: DecisionProvider> {
    mode: TransferMode,
    files: Vec<F>,
    dest_folder: F,
    rename_to: Option<String>,
    provider: P,
    ctx: ResolutionContext,
    monitor: Arc<JobMonitor>,
    stats: TransferStats,
    pending_archives: Vec<Box<dyn RwArchive>>,
    preserve_metadata: bool,
    error_title: String,
}

impl<F: VfsEntry, P: DecisionProvider> TransferJob<F, P> {
    pub fn new(
        mode: TransferMode,
        files: Vec<F>,
        dest_folder: F,
        provider: P,
        monitor: Arc<JobMonitor>,
    ) -> Self {
        let error_title = match mode {
            TransferMode::Copy => "Copy error".to_string(),
            TransferMode::Move => "Move error".to_string(),
        };
        Self {
            mode,
            files,
            dest_folder,
            rename_to: None,
            provider,
            ctx: ResolutionContext::new(CollisionAction::Ask),
            monitor,
            stats: TransferStats::default(),
            pending_archives: Vec::new(),
            preserve_metadata: false,
            error_title,
        }
    }

    /// Transfer a single source under a different name in the destination.
    pub fn with_rename_to(mut self, name: Option<String>) -> Self {
        self.rename_to = name;
        self
    }

    /// Collision action applied without prompting; `Ask` prompts every time.
    pub fn with_default_action(mut self, action: CollisionAction) -> Self {
        self.ctx = ResolutionContext::new(action);
        self
    }

    pub fn with_preserve_metadata(mut self, preserve: bool) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    pub fn monitor(&self) -> &Arc<JobMonitor> {
        &self.monitor
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Register a writable archive touched by this job. Each archive is
    /// optimized at most once, at the end of the run.
    pub fn mark_archive_for_optimization(&mut self, archive: Box<dyn RwArchive>) {
        if self.pending_archives.iter().any(|a| a.name() == archive.name()) {
            return;
        }
        self.pending_archives.push(archive);
    }

    /// Resolve the destination for one file of the set.
    ///
    /// Never returns a handle-less outcome other than `AbandonFile` or
    /// `AbortJob`; once `AbortJob` has been produced, every further call
    /// returns `AbortJob` immediately without prompting.
    pub fn resolve_destination(&mut self, file: &F) -> ResolutionOutcome<F> {
        let folder = self.dest_folder.clone();
        let rename = self.rename_to.clone();
        self.resolve_in(file, &folder, rename.as_deref())
    }

    fn resolve_in(&mut self, file: &F, folder: &F, name_override: Option<&str>) -> ResolutionOutcome<F> {
        if self.monitor.is_cancelled() {
            return ResolutionOutcome::AbortJob;
        }
        self.ctx.append = false;

        let dest_name = name_override.map(str::to_owned).unwrap_or_else(|| file.name());
        // Case-only variation is legitimate exactly when the caller asked for
        // a different name (renaming `Foo` to `foo` in place).
        let allow_case_variation = name_override.is_some();

        let Some(dest) = create_destination(&mut self.provider, folder, &dest_name, &self.error_title)
        else {
            self.monitor.request_cancel();
            return ResolutionOutcome::AbortJob;
        };

        let outcome = resolve_collision(
            &mut self.ctx,
            &self.monitor,
            &mut self.provider,
            file,
            folder,
            dest,
            allow_case_variation,
            &self.error_title,
        );

        match outcome {
            ResolutionOutcome::ProceedFresh(d)
                if name_override.is_some() && d.name() != file.name() =>
            {
                ResolutionOutcome::ProceedRenamed(d)
            }
            other => other,
        }
    }

    /// Run the whole job: resolve and transfer every file of the set, then
    /// optimize pending archives. Returns the final counters, or
    /// [`TransferError::Interrupted`] when the job was aborted.
    pub fn run(&mut self) -> Result<TransferStats, TransferError> {
        self.monitor.start();
        let files = self.files.clone();
        let rename = self.rename_to.clone();
        let dest_folder = self.dest_folder.clone();

        let mut aborted = false;
        for file in &files {
            if self.monitor.is_cancelled() {
                aborted = true;
                break;
            }
            if !self.process_entry(file, &dest_folder, rename.as_deref()) {
                aborted = true;
                break;
            }
        }

        if aborted || self.monitor.is_cancelled() {
            info!(stats = ?self.stats, "transfer interrupted");
            return Err(TransferError::Interrupted);
        }

        self.optimize_pending_archives();
        info!(stats = ?self.stats, "transfer finished");
        Ok(self.stats.clone())
    }

    /// Optimize every archive registered during the run, each at most once.
    pub fn optimize_pending_archives(&mut self) {
        let mut archives = std::mem::take(&mut self.pending_archives);
        for archive in &mut archives {
            optimize_archive(
                &self.monitor,
                &mut self.provider,
                archive.as_mut(),
                &self.error_title,
            );
        }
    }

    /// Returns false when the job must stop.
    fn process_entry(&mut self, file: &F, dest_folder: &F, name_override: Option<&str>) -> bool {
        if self.monitor.is_cancelled() {
            return false;
        }

        let (dest, append) = match self.resolve_in(file, dest_folder, name_override) {
            ResolutionOutcome::ProceedFresh(d) | ResolutionOutcome::ProceedRenamed(d) => (d, false),
            ResolutionOutcome::ProceedAppend(d) => (d, true),
            ResolutionOutcome::AbandonFile => {
                debug!(file = %file.path().display(), "skipping");
                self.stats.files_skipped += 1;
                return true;
            }
            ResolutionOutcome::AbortJob => return false,
        };

        if file.is_dir() {
            self.transfer_directory(file, &dest)
        } else {
            self.transfer_file(file, &dest, append)
        }
    }

    fn transfer_directory(&mut self, src: &F, dest: &F) -> bool {
        if !dest.exists() {
            if !self.mkdir_with_retry(dest) {
                return false;
            }
            self.stats.directories_created += 1;
        }

        let Some(children) = self.children_with_retry(src) else {
            return false;
        };
        for child in &children {
            if self.monitor.is_cancelled() {
                return false;
            }
            if !self.process_entry(child, dest, None) {
                return false;
            }
        }

        if self.mode == TransferMode::Move {
            // Skipped children leave the source occupied; that is fine.
            if let Err(e) = src.delete() {
                debug!(dir = %src.path().display(), error = %e, "source folder not removed");
            }
        }
        true
    }

    fn transfer_file(&mut self, src: &F, dest: &F, append: bool) -> bool {
        let src_size = src.size();

        // Move fast path: a plain rename when nothing has to be merged.
        if self.mode == TransferMode::Move
            && !append
            && !dest.exists()
            && src.supports(FileOp::Rename)
            && dest.supports(FileOp::Rename)
        {
            match src.rename_to(dest) {
                Ok(()) => {
                    debug!(src = %src.path().display(), dest = %dest.path().display(),
                        "renamed in place");
                    self.stats.files_transferred += 1;
                    self.stats.bytes_transferred += src_size;
                    return true;
                }
                Err(e) => {
                    debug!(error = %e, hint = rename_failure_hint(&e), "rename failed, copying");
                }
            }
        }

        loop {
            match copy_bytes(src, dest, append) {
                Ok(bytes) => {
                    self.stats.files_transferred += 1;
                    self.stats.bytes_transferred += bytes;
                    if self.preserve_metadata {
                        if let Err(e) = dest.preserve_metadata_from(src) {
                            warn!(dest = %dest.path().display(), error = %e,
                                "could not preserve metadata");
                        }
                    }
                    if self.mode == TransferMode::Move {
                        if let Err(e) = src.delete() {
                            warn!(src = %src.path().display(), error = %e,
                                "source not removed after move");
                        }
                    }
                    debug!(src = %src.path().display(), dest = %dest.path().display(),
                        bytes, append, "transferred");
                    return true;
                }
                Err(e) => {
                    let message = format!("Cannot write file {}: {e}", dest.name());
                    match self.provider.ask_retry_on_error(&self.error_title, &message) {
                        RetryChoice::Retry => continue,
                        RetryChoice::Abort => {
                            self.monitor.request_cancel();
                            return false;
                        }
                    }
                }
            }
        }
    }

    fn mkdir_with_retry(&mut self, dest: &F) -> bool {
        loop {
            match dest.mkdir() {
                Ok(()) => return true,
                Err(e) => {
                    let message = format!("Cannot create folder {}: {e}", dest.name());
                    match self.provider.ask_retry_on_error(&self.error_title, &message) {
                        RetryChoice::Retry => continue,
                        RetryChoice::Abort => {
                            self.monitor.request_cancel();
                            return false;
                        }
                    }
                }
            }
        }
    }

    fn children_with_retry(&mut self, dir: &F) -> Option<Vec<F>> {
        loop {
            match dir.children() {
                Ok(children) => return Some(children),
                Err(e) => {
                    let message = format!("Cannot read folder {}: {e}", dir.name());
                    match self.provider.ask_retry_on_error(&self.error_title, &message) {
                        RetryChoice::Retry => continue,
                        RetryChoice::Abort => {
                            self.monitor.request_cancel();
                            return None;
                        }
                    }
                }
            }
        }
    }
}

/// Buffered byte transfer through the VFS streams.
fn copy_bytes<F: VfsEntry>(src: &F, dest: &F, append: bool) -> io::Result<u64> {
    let reader = src.open_read()?;
    let writer = dest.open_write(append)?;
    let mut reader = BufReader::with_capacity(COPY_BUF_SIZE, reader);
    let mut writer = BufWriter::with_capacity(COPY_BUF_SIZE, writer);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(bytes)
}

#[cfg(unix)]
fn rename_failure_hint(e: &io::Error) -> &'static str {
    match e.raw_os_error() {
        Some(code) if code == libc::EXDEV => "cross-filesystem; copying instead",
        Some(code) if code == libc::EACCES || code == libc::EPERM => {
            "permission denied; check destination perms"
        }
        _ => "falling back to copy",
    }
}

#[cfg(not(unix))]
fn rename_failure_hint(e: &io::Error) -> &'static str {
    match e.kind() {
        io::ErrorKind::PermissionDenied => "permission denied; check destination perms",
        _ => "falling back to copy",
    }
}
