//! Progress reporting for indexing runs.
//!
//! The host supplies a [`ProgressUi`] that opens a cancellable progress
//! affordance per run. The pipeline feeds it through a
//! [`ProgressReporter`] and watches the returned cancellation token.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One progress increment, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub increment: f64,
    /// Accumulated percentage after this increment
    pub current: f64,
}

/// Trait for receiving progress updates.
pub trait ProgressReporter: Send + Sync {
    /// Called once per scanned file.
    fn report(&self, update: &ProgressUpdate);
}

/// A no-op reporter for when progress reporting isn't needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// A reporter that logs every `every_percent` percent at info level.
#[derive(Debug)]
pub struct LoggingProgressReporter {
    every_percent: f64,
    last_logged: Mutex<f64>,
}

impl LoggingProgressReporter {
    pub fn new(every_percent: f64) -> Self {
        Self {
            every_percent: every_percent.max(f64::EPSILON),
            last_logged: Mutex::new(0.0),
        }
    }
}

impl Default for LoggingProgressReporter {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl ProgressReporter for LoggingProgressReporter {
    fn report(&self, update: &ProgressUpdate) {
        let mut last = self.last_logged.lock().unwrap_or_else(PoisonError::into_inner);
        if update.current < *last {
            // A new run started.
            *last = 0.0;
        }
        if update.current - *last >= self.every_percent || update.current >= 100.0 - f64::EPSILON {
            info!(percent = update.current.min(100.0).round(), "Indexing progress");
            *last = update.current;
        }
    }
}

/// Per-run progress bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressState {
    /// Percent per file, fixed on the first scanned file
    pub step: f64,
    pub current: f64,
    pub scanned_count: usize,
}

impl ProgressState {
    /// Record one scanned file out of `total`.
    pub fn on_file_scanned(&mut self, total: usize) -> ProgressUpdate {
        if self.scanned_count == 0 {
            self.step = if total == 0 { 0.0 } else { 100.0 / total as f64 };
        }
        self.scanned_count += 1;
        self.current += self.step;
        ProgressUpdate {
            increment: self.step,
            current: self.current,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A running progress affordance.
#[derive(Clone)]
pub struct ProgressHandle {
    pub reporter: Arc<dyn ProgressReporter>,
    /// Fired when the user asks to cancel the run
    pub cancel: CancellationToken,
}

impl ProgressHandle {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            cancel: CancellationToken::new(),
        }
    }
}

impl std::fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Host-side progress affordance.
pub trait ProgressUi: Send + Sync {
    /// Open a progress affordance titled `title` for one run.
    fn start(&self, title: &str) -> ProgressHandle;
}

/// [`ProgressUi`] that logs progress and can cancel the active run.
#[derive(Debug, Default)]
pub struct LoggingProgressUi {
    active: Mutex<Option<CancellationToken>>,
}

impl LoggingProgressUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the run currently shown, if any.
    pub fn cancel_active(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.as_ref() {
            token.cancel();
        }
    }
}

impl ProgressUi for LoggingProgressUi {
    fn start(&self, title: &str) -> ProgressHandle {
        debug!(title = %title, "Starting progress");
        let handle = ProgressHandle::new(Arc::new(LoggingProgressReporter::default()));
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle.cancel.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_fixed_on_first_file() {
        let mut state = ProgressState::default();

        let first = state.on_file_scanned(4);
        assert_eq!(first.increment, 25.0);
        assert_eq!(first.current, 25.0);

        // Later totals do not change the step.
        let second = state.on_file_scanned(10);
        assert_eq!(second.increment, 25.0);
        assert_eq!(second.current, 50.0);
        assert_eq!(state.scanned_count, 2);

        state.reset();
        assert_eq!(state, ProgressState::default());
    }

    #[test]
    fn test_full_run_reaches_hundred() {
        let mut state = ProgressState::default();
        let mut last = ProgressUpdate {
            increment: 0.0,
            current: 0.0,
        };
        for _ in 0..3 {
            last = state.on_file_scanned(3);
        }
        assert!((last.current - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_logging_ui_cancels_active_run() {
        let ui = LoggingProgressUi::new();
        ui.cancel_active();

        let first = ui.start("Indexing");
        let second = ui.start("Indexing");
        ui.cancel_active();

        assert!(!first.cancel.is_cancelled());
        assert!(second.cancel.is_cancelled());
    }

    #[test]
    fn test_reporters_accept_updates() {
        let update = ProgressUpdate {
            increment: 50.0,
            current: 50.0,
        };
        NoOpProgressReporter.report(&update);
        LoggingProgressReporter::default().report(&update);
        LoggingProgressReporter::new(1.0).report(&update);
    }
}
