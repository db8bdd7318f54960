//! Job-scoped mutable state and the cross-thread monitor.
//!
//! `ResolutionContext` is private to the job's worker thread; no external
//! synchronization. `JobMonitor` is the single-writer/multi-reader side:
//! reporting code polls it from other threads, so its flags are atomics.
//! Relaxed ordering is sufficient for these one-way/latest-value flags.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::job::decision::CollisionAction;

/// Mutable state threaded through the resolution loop for one job.
#[derive(Debug)]
pub struct ResolutionContext {
    /// True only while the current file resolved to a Resume; reset when
    /// resolution begins for the next file.
    pub append: bool,
    /// Default collision action. `Ask` means "prompt the operator".
    pub default_action: CollisionAction,
}

impl ResolutionContext {
    pub fn new(default_action: CollisionAction) -> Self {
        Self { append: false, default_action }
    }
}

#[derive(Debug, Default)]
struct TimerState {
    started: Option<Instant>,
    pause_began: Option<Instant>,
    paused_total: Duration,
}

/// Pause/cancel/optimizing flags shared between the job thread and observers.
#[derive(Debug, Default)]
pub struct JobMonitor {
    paused: AtomicBool,
    cancelled: AtomicBool,
    optimizing: AtomicBool,
    timer: Mutex<TimerState>,
}

impl JobMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cooperative cancel (idempotent). Observed by the job at the
    /// top of the per-file loop and at every suspension point.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Mark the start of active transfer time.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        timer.started.get_or_insert_with(Instant::now);
    }

    /// Flip the paused flag; paused intervals are excluded from
    /// [`JobMonitor::active_elapsed`] so waits do not skew throughput.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if paused {
            timer.pause_began.get_or_insert_with(Instant::now);
        } else if let Some(began) = timer.pause_began.take() {
            timer.paused_total += began.elapsed();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_optimizing(&self, optimizing: bool) {
        self.optimizing.store(optimizing, Ordering::Relaxed);
    }

    /// True while an archive repack is in flight, so reporting can
    /// distinguish that phase from file transfer.
    pub fn is_optimizing(&self) -> bool {
        self.optimizing.load(Ordering::Relaxed)
    }

    /// Wall time since `start`, minus every paused interval.
    pub fn active_elapsed(&self) -> Duration {
        let timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        let Some(started) = timer.started else {
            return Duration::ZERO;
        };
        let mut paused = timer.paused_total;
        if let Some(began) = timer.pause_began {
            paused += began.elapsed();
        }
        started.elapsed().saturating_sub(paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn context_starts_without_append() {
        let ctx = ResolutionContext::new(CollisionAction::Ask);
        assert!(!ctx.append);
        assert_eq!(ctx.default_action, CollisionAction::Ask);
    }

    #[test]
    fn cancel_is_sticky() {
        let monitor = JobMonitor::new();
        assert!(!monitor.is_cancelled());
        monitor.request_cancel();
        monitor.request_cancel();
        assert!(monitor.is_cancelled());
    }

    #[test]
    fn paused_time_is_excluded_from_active_elapsed() {
        let monitor = JobMonitor::new();
        monitor.start();
        thread::sleep(Duration::from_millis(20));
        monitor.set_paused(true);
        thread::sleep(Duration::from_millis(60));
        monitor.set_paused(false);
        let active = monitor.active_elapsed();
        assert!(active < Duration::from_millis(60), "active = {active:?}");
    }

    #[test]
    fn optimizing_flag_round_trips() {
        let monitor = JobMonitor::new();
        assert!(!monitor.is_optimizing());
        monitor.set_optimizing(true);
        assert!(monitor.is_optimizing());
        monitor.set_optimizing(false);
        assert!(!monitor.is_optimizing());
    }
}
