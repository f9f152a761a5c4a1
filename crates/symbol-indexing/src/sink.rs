//! Downstream collaborators: cache, user notifier and structure logger.

use std::path::Path;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use symbol_types::{PresentedRecord, ScanResult};
use tracing::{debug, error, info, warn};

/// Summary of one finished pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files the scanner reported as scanned
    pub scanned_files: usize,
    /// Presented records written to the cache
    pub indexed_items: usize,
    /// Wall-clock duration of the run, including the stats delay
    pub elapsed_secs: f64,
}

/// Store of presented records read by the picker.
pub trait IndexCache: Send + Sync {
    /// Replace the whole index.
    fn update_data(&self, records: Vec<PresentedRecord>);

    /// Replace the records of `uri`, or of every file below it for a
    /// folder.
    fn update_for_uri(&self, uri: &Path, records: Vec<PresentedRecord>);

    /// Drop the records of `uri`, or of every file below it for a folder.
    fn remove_for_uri(&self, uri: &Path);

    /// Current contents.
    fn records(&self) -> Vec<PresentedRecord>;
}

/// One-line, user-facing messages.
pub trait Notifier: Send + Sync {
    fn print_no_folder_opened_message(&self);
    fn print_error_message(&self, message: &str);
    fn print_stats_message(&self, stats: &IndexStats);
}

/// Diagnostic log of pipeline runs.
pub trait IndexLogger: Send + Sync {
    fn log_scan_time(&self, stats: &IndexStats);
    fn log_structure(&self, result: &ScanResult);
}

/// In-memory [`IndexCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: RwLock<Vec<PresentedRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<PresentedRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<PresentedRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IndexCache for MemoryCache {
    fn update_data(&self, records: Vec<PresentedRecord>) {
        debug!(records = records.len(), "Replacing cached index");
        *self.write() = records;
    }

    fn update_for_uri(&self, uri: &Path, records: Vec<PresentedRecord>) {
        let mut cached = self.write();
        cached.retain(|record| !record.belongs_to(uri));
        cached.extend(records);
    }

    fn remove_for_uri(&self, uri: &Path) {
        let mut cached = self.write();
        let before = cached.len();
        cached.retain(|record| !record.belongs_to(uri));
        debug!(uri = %uri.display(), removed = before - cached.len(), "Removed cached records");
    }

    fn records(&self) -> Vec<PresentedRecord> {
        self.read().clone()
    }
}

/// [`Notifier`] writing to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn print_no_folder_opened_message(&self) {
        warn!("No workspace folder is open, nothing to index");
    }

    fn print_error_message(&self, message: &str) {
        error!(message = %message, "Indexing error");
    }

    fn print_stats_message(&self, stats: &IndexStats) {
        info!(
            files = stats.scanned_files,
            items = stats.indexed_items,
            "Indexed {} files and {} items in {:.2}s",
            stats.scanned_files,
            stats.indexed_items,
            stats.elapsed_secs
        );
    }
}

/// [`IndexLogger`] writing to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingIndexLogger;

impl IndexLogger for TracingIndexLogger {
    fn log_scan_time(&self, stats: &IndexStats) {
        info!(
            elapsed_secs = stats.elapsed_secs,
            files = stats.scanned_files,
            items = stats.indexed_items,
            "Scan finished"
        );
    }

    fn log_structure(&self, result: &ScanResult) {
        for item in result.items.values() {
            debug!(uri = %item.uri.display(), elements = item.elements.len(), "Indexed file");
        }
        debug!(files = result.file_count(), elements = result.count, "Index structure");
    }
}
