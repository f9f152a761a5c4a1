//! End-to-end test infrastructure for the symbol index.
//!
//! Provides a shared TestHarness and scripted collaborators for E2E tests
//! covering the queue-to-cache pipeline: a fixed file list, a symbol
//! provider that can be delayed or blocked per file, and notifier, logger
//! and progress implementations that record what they were told.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use symbol_indexing::{
    FileEnumerator, IndexCache, IndexLogger, IndexStats, IndexingError, MemoryCache, Notifier, ProgressHandle,
    ProgressReporter, ProgressUi, ProgressUpdate, SymbolProvider, Workspace,
};
use symbol_types::{DocumentSymbol, Range, ScanResult, Settings, SymbolKind};

/// Root folder every scripted path lives under.
pub const WORKSPACE_ROOT: &str = "/ws";

/// Absolute scripted path for `name`.
pub fn ws_path(name: &str) -> PathBuf {
    Path::new(WORKSPACE_ROOT).join(name)
}

/// Single-line symbol at zero-based `line`.
pub fn symbol(name: &str, kind: SymbolKind, line: u32) -> DocumentSymbol {
    DocumentSymbol::new(name, kind, Range::lines(line, line))
}

/// Settings with the stats delay removed.
pub fn fast_settings() -> Settings {
    Settings {
        stats_delay_ms: 0,
        ..Default::default()
    }
}

/// File enumerator returning a fixed, mutable list.
#[derive(Default)]
pub struct StaticFileEnumerator {
    folders: Vec<PathBuf>,
    files: Mutex<Vec<PathBuf>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl StaticFileEnumerator {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            folders: vec![PathBuf::from(WORKSPACE_ROOT)],
            files: Mutex::new(files),
            ..Default::default()
        }
    }

    /// An enumerator with no workspace folder open.
    pub fn no_folders() -> Self {
        Self::default()
    }

    /// Replace the scripted file list, e.g. after a move on disk.
    pub fn set_files(&self, files: Vec<PathBuf>) {
        *self.files.lock().unwrap() = files;
    }

    /// Make every following `find_files` call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileEnumerator for StaticFileEnumerator {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    async fn find_files(&self, _include: &[String], _exclude: &[String]) -> Result<Vec<PathBuf>, IndexingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(IndexingError::Enumeration(message));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    /// A scripted path is a folder when some scripted file lies below it.
    async fn is_folder(&self, path: &Path) -> bool {
        self.files
            .lock()
            .unwrap()
            .iter()
            .any(|file| file != path && file.starts_with(path))
    }
}

/// Pair of signals used to hold a symbol query open.
#[derive(Clone, Default)]
pub struct Gate {
    /// Notified when the blocked query starts
    pub started: Arc<Notify>,
    /// Notify to let the blocked query finish
    pub release: Arc<Notify>,
}

impl Gate {
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }
}

/// Symbol provider answering from a per-file script.
#[derive(Default)]
pub struct ScriptedSymbolProvider {
    symbols: Mutex<HashMap<PathBuf, Vec<DocumentSymbol>>>,
    not_ready: Mutex<HashMap<PathBuf, u32>>,
    gates: Mutex<HashMap<PathBuf, Gate>>,
    calls: Mutex<HashMap<PathBuf, u32>>,
}

impl ScriptedSymbolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_symbols(&self, path: impl Into<PathBuf>, symbols: Vec<DocumentSymbol>) {
        self.symbols.lock().unwrap().insert(path.into(), symbols);
    }

    /// Report "not ready" for the next `times` queries of `path`.
    pub fn not_ready_for(&self, path: impl Into<PathBuf>, times: u32) {
        self.not_ready.lock().unwrap().insert(path.into(), times);
    }

    /// Block the next query of `path` until the returned gate is opened.
    pub fn block(&self, path: impl Into<PathBuf>) -> Gate {
        let gate = Gate::default();
        self.gates.lock().unwrap().insert(path.into(), gate.clone());
        gate
    }

    pub fn calls(&self, path: &Path) -> u32 {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SymbolProvider for ScriptedSymbolProvider {
    async fn document_symbols(&self, path: &Path) -> Option<Vec<DocumentSymbol>> {
        *self.calls.lock().unwrap().entry(path.to_path_buf()).or_insert(0) += 1;

        let gate = self.gates.lock().unwrap().remove(path);
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        {
            let mut not_ready = self.not_ready.lock().unwrap();
            if let Some(remaining) = not_ready.get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return None;
                }
            }
        }

        Some(self.symbols.lock().unwrap().get(path).cloned().unwrap_or_default())
    }
}

/// Message passed to the [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum NotifierMessage {
    NoFolderOpened,
    Error(String),
    Stats(IndexStats),
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<NotifierMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<NotifierMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn stats(&self) -> Vec<IndexStats> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                NotifierMessage::Stats(stats) => Some(stats),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                NotifierMessage::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn print_no_folder_opened_message(&self) {
        self.messages.lock().unwrap().push(NotifierMessage::NoFolderOpened);
    }

    fn print_error_message(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(NotifierMessage::Error(message.to_string()));
    }

    fn print_stats_message(&self, stats: &IndexStats) {
        self.messages.lock().unwrap().push(NotifierMessage::Stats(*stats));
    }
}

/// Logger keeping every scan structure it was shown.
#[derive(Default)]
pub struct RecordingLogger {
    scan_times: Mutex<Vec<IndexStats>>,
    structures: Mutex<Vec<ScanResult>>,
}

impl RecordingLogger {
    pub fn last_structure(&self) -> Option<ScanResult> {
        self.structures.lock().unwrap().last().cloned()
    }

    pub fn scan_times(&self) -> Vec<IndexStats> {
        self.scan_times.lock().unwrap().clone()
    }
}

impl IndexLogger for RecordingLogger {
    fn log_scan_time(&self, stats: &IndexStats) {
        self.scan_times.lock().unwrap().push(*stats);
    }

    fn log_structure(&self, result: &ScanResult) {
        self.structures.lock().unwrap().push(result.clone());
    }
}

/// Reporter recording updates and optionally cancelling its run.
pub struct RecordingReporter {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
    cancel_after: Option<usize>,
    token: CancellationToken,
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, update: &ProgressUpdate) {
        let mut updates = self.updates.lock().unwrap();
        updates.push(*update);
        if self.cancel_after == Some(updates.len()) {
            self.token.cancel();
        }
    }
}

/// Progress UI that can cancel a run after a number of scanned files.
#[derive(Default)]
pub struct ScriptedProgressUi {
    cancel_after: Mutex<Option<usize>>,
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
    runs: AtomicUsize,
}

impl ScriptedProgressUi {
    /// Cancel the next run once `files` files were reported.
    pub fn cancel_after(&self, files: usize) {
        *self.cancel_after.lock().unwrap() = Some(files);
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ProgressUi for ScriptedProgressUi {
    fn start(&self, _title: &str) -> ProgressHandle {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().unwrap().clear();

        let token = CancellationToken::new();
        let reporter = RecordingReporter {
            updates: self.updates.clone(),
            cancel_after: self.cancel_after.lock().unwrap().take(),
            token: token.clone(),
        };
        ProgressHandle {
            reporter: Arc::new(reporter),
            cancel: token,
        }
    }
}

/// Shared test harness for E2E tests.
///
/// Wires a [`Workspace`] to scripted collaborators and keeps handles to
/// all of them for assertions.
pub struct TestHarness {
    pub workspace: Workspace,
    pub enumerator: Arc<StaticFileEnumerator>,
    pub provider: Arc<ScriptedSymbolProvider>,
    pub cache: Arc<MemoryCache>,
    pub notifier: Arc<RecordingNotifier>,
    pub logger: Arc<RecordingLogger>,
    pub progress: Arc<ScriptedProgressUi>,
}

impl TestHarness {
    /// Harness over `/ws/<name>` for each of `files`, with [`fast_settings`].
    pub fn new(files: &[&str]) -> Self {
        Self::with_settings(files, fast_settings())
    }

    pub fn with_settings(files: &[&str], settings: Settings) -> Self {
        let enumerator = Arc::new(StaticFileEnumerator::new(
            files.iter().map(|name| ws_path(name)).collect(),
        ));
        Self::build(enumerator, settings)
    }

    /// Harness with no workspace folder open.
    pub fn without_folders() -> Self {
        Self::build(Arc::new(StaticFileEnumerator::no_folders()), fast_settings())
    }

    fn build(enumerator: Arc<StaticFileEnumerator>, settings: Settings) -> Self {
        let provider = Arc::new(ScriptedSymbolProvider::new());
        let cache = Arc::new(MemoryCache::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let logger = Arc::new(RecordingLogger::default());
        let progress = Arc::new(ScriptedProgressUi::default());

        let workspace = Workspace::builder(enumerator.clone(), provider.clone())
            .with_settings(settings)
            .with_cache(cache.clone())
            .with_notifier(notifier.clone())
            .with_logger(logger.clone())
            .with_progress_ui(progress.clone())
            .build();

        Self {
            workspace,
            enumerator,
            provider,
            cache,
            notifier,
            logger,
            progress,
        }
    }

    /// Labels of the cached records, in cache order.
    pub fn labels(&self) -> Vec<String> {
        self.cache.records().into_iter().map(|r| r.label).collect()
    }
}
