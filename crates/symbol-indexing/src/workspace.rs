//! Pipeline orchestration: queued full and incremental index passes.
//!
//! [`Workspace`] is the entry point hosts use. Every request becomes an
//! [`Action`] on the shared [`ActionQueue`]; the action bodies call into
//! [`IndexPipeline`], which runs scanner, presenter and cache write.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use symbol_scheduler::{Action, ActionQueue, ActionTrigger, SchedulerError};
use symbol_types::{PresentedRecord, Settings};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cancel::CancellationFlag;
use crate::presenter::present;
use crate::progress::{LoggingProgressUi, ProgressReporter, ProgressState, ProgressUi};
use crate::provider::{is_path_selected, FileEnumerator, SymbolProvider};
use crate::scanner::{Scanner, ScannerConfig};
use crate::sink::{IndexCache, IndexLogger, IndexStats, MemoryCache, Notifier, TracingIndexLogger, TracingNotifier};

const PROGRESS_TITLE: &str = "Indexing workspace";

/// Typed editor and filesystem events.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    Startup,
    /// New effective settings
    ConfigChanged(Box<Settings>),
    FoldersChanged,
    Created(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

/// Collaborators and state shared by every queued pipeline run.
pub struct IndexPipeline {
    settings: RwLock<Settings>,
    enumerator: Arc<dyn FileEnumerator>,
    provider: Arc<dyn SymbolProvider>,
    cache: Arc<dyn IndexCache>,
    notifier: Arc<dyn Notifier>,
    logger: Arc<dyn IndexLogger>,
    progress_ui: Arc<dyn ProgressUi>,
    cancel: CancellationFlag,
}

impl IndexPipeline {
    /// Full index pass under a progress affordance.
    ///
    /// Returns `None` without touching the cache when no workspace folder
    /// is open.
    pub async fn index_with_progress(&self) -> Option<IndexStats> {
        if self.enumerator.workspace_folders().is_empty() {
            self.notifier.print_no_folder_opened_message();
            return None;
        }

        let handle = self.progress_ui.start(PROGRESS_TITLE);
        let stats = self
            .index_with_progress_task(handle.reporter.as_ref(), &handle.cancel)
            .await;
        Some(stats)
    }

    /// Scan, present and cache the whole workspace, reporting progress
    /// to `reporter` and aborting when `cancel_token` fires.
    pub async fn index_with_progress_task(
        &self,
        reporter: &dyn ProgressReporter,
        cancel_token: &CancellationToken,
    ) -> IndexStats {
        let settings = self.settings();
        self.cancel.reset();
        let started = Instant::now();

        let listener = {
            let flag = self.cancel.clone();
            let token = cancel_token.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                flag.cancel();
            })
        };
        // The listener only runs once this task yields.
        if cancel_token.is_cancelled() {
            self.cancel.cancel();
        }

        let progress = Mutex::new(ProgressState::default());
        let on_file_scanned = |total: usize| {
            let update = progress
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_file_scanned(total);
            reporter.report(&update);
            if cancel_token.is_cancelled() {
                self.cancel.cancel();
            }
        };

        let result = self
            .scanner(&settings)
            .scan(None, &self.cancel, &on_file_scanned)
            .await;
        let records = present(&result, &settings.presentation, &self.cancel);
        let indexed_items = records.len();
        self.cache.update_data(records);

        listener.abort();
        if cancel_token.is_cancelled() || self.cancel.is_cancelled() {
            info!("Indexing cancelled");
            self.cancel.reset();
        }

        let scanned_files = {
            let mut state = progress.lock().unwrap_or_else(PoisonError::into_inner);
            let scanned = state.scanned_count;
            state.reset();
            scanned
        };

        tokio::time::sleep(settings.stats_delay()).await;

        let stats = IndexStats {
            scanned_files,
            indexed_items,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        self.notifier.print_stats_message(&stats);
        self.logger.log_scan_time(&stats);
        self.logger.log_structure(&result);
        stats
    }

    /// Rescan one file, or every selected file below a folder, and
    /// replace the cached records under `uri`.
    ///
    /// Files outside the workspace or the include/exclude set are
    /// ignored.
    pub async fn update_file(&self, uri: &Path) {
        let settings = self.settings();

        if self.enumerator.is_folder(uri).await {
            self.update_folder(uri, &settings).await;
            return;
        }

        let folders = self.enumerator.workspace_folders();
        match is_path_selected(uri, &folders, &settings.include, &settings.exclude) {
            Ok(true) => {}
            Ok(false) => {
                debug!(uri = %uri.display(), "Ignoring update outside the indexed set");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Cannot evaluate include/exclude patterns");
                self.notifier.print_error_message(&e.to_string());
                return;
            }
        }

        let records = self.rescan(&[uri.to_path_buf()], &settings).await;
        debug!(uri = %uri.display(), records = records.len(), "Updated file");
        self.cache.update_for_uri(uri, records);
    }

    async fn update_folder(&self, folder: &Path, settings: &Settings) {
        let files = match self
            .enumerator
            .find_files_in(folder, &settings.include, &settings.exclude)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, folder = %folder.display(), "Folder enumeration failed");
                self.notifier.print_error_message(&e.to_string());
                return;
            }
        };

        // An empty uri list would rescan the whole workspace.
        let records = if files.is_empty() {
            Vec::new()
        } else {
            self.rescan(&files, settings).await
        };
        debug!(folder = %folder.display(), files = files.len(), records = records.len(), "Updated folder");
        self.cache.update_for_uri(folder, records);
    }

    /// Scan and present `uris` outside any full pass.
    async fn rescan(&self, uris: &[PathBuf], settings: &Settings) -> Vec<PresentedRecord> {
        // Incremental passes are not cancellable.
        let cancel = CancellationFlag::new();
        let result = self.scanner(settings).scan(Some(uris), &cancel, &|_| {}).await;
        present(&result, &settings.presentation, &cancel)
    }

    /// Drop the cached records of a file, or of everything below a folder.
    pub fn remove_path(&self, uri: &Path) {
        debug!(uri = %uri.display(), "Removing path from index");
        self.cache.remove_for_uri(uri);
    }

    /// Ask the active full pass to stop. Idempotent.
    pub fn cancel_indexing(&self) {
        self.cancel.cancel();
    }

    /// Store new settings, returning whether the indexed set changed.
    pub fn apply_settings(&self, settings: Settings) -> bool {
        let mut current = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let changed = current.include != settings.include
            || current.exclude != settings.exclude
            || current.items_filter != settings.items_filter
            || current.presentation != settings.presentation
            || current.retry != settings.retry;
        *current = settings;
        changed
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn cache(&self) -> &Arc<dyn IndexCache> {
        &self.cache
    }

    fn scanner(&self, settings: &Settings) -> Scanner {
        Scanner::new(
            ScannerConfig::from_settings(settings),
            self.enumerator.clone(),
            self.provider.clone(),
            self.notifier.clone(),
        )
    }
}

/// Host-facing indexing service.
#[derive(Clone)]
pub struct Workspace {
    queue: Arc<ActionQueue>,
    pipeline: Arc<IndexPipeline>,
}

impl Workspace {
    pub fn builder(
        enumerator: Arc<dyn FileEnumerator>,
        provider: Arc<dyn SymbolProvider>,
    ) -> WorkspaceBuilder {
        WorkspaceBuilder::new(enumerator, provider)
    }

    /// Queue a full reindex.
    pub async fn index(&self, trigger: ActionTrigger) -> Result<(), SchedulerError> {
        let pipeline = self.pipeline.clone();
        let action = Action::rebuild(trigger, move || async move {
            pipeline.index_with_progress().await;
            Ok(())
        });
        self.queue.register(action).await
    }

    /// Queue a rescan of one file.
    pub async fn update(&self, trigger: ActionTrigger, uri: impl Into<PathBuf>) -> Result<(), SchedulerError> {
        let uri = uri.into();
        let pipeline = self.pipeline.clone();
        let target = uri.clone();
        let action = Action::update(trigger, uri, move || async move {
            pipeline.update_file(&target).await;
            Ok(())
        });
        self.queue.register(action).await
    }

    /// Queue the removal of a file or folder.
    pub async fn remove(&self, trigger: ActionTrigger, uri: impl Into<PathBuf>) -> Result<(), SchedulerError> {
        let uri = uri.into();
        let pipeline = self.pipeline.clone();
        let target = uri.clone();
        let action = Action::remove(trigger, uri, move || async move {
            pipeline.remove_path(&target);
            Ok(())
        });
        self.queue.register(action).await
    }

    /// Ask the running full pass to stop. Idempotent.
    pub fn cancel_indexing(&self) {
        self.pipeline.cancel_indexing();
    }

    /// Translate an editor event into queued work.
    pub async fn handle_event(&self, event: WorkspaceEvent) -> Result<(), SchedulerError> {
        debug!(event = ?event, "Workspace event");
        match event {
            WorkspaceEvent::Startup => self.index(ActionTrigger::Startup).await,
            WorkspaceEvent::ConfigChanged(settings) => {
                if self.pipeline.apply_settings(*settings) {
                    self.index(ActionTrigger::ConfigChange).await
                } else {
                    debug!("Settings changed without affecting the index");
                    Ok(())
                }
            }
            WorkspaceEvent::FoldersChanged => self.index(ActionTrigger::FoldersChange).await,
            WorkspaceEvent::Created(uri) => self.update(ActionTrigger::DidCreate, uri).await,
            WorkspaceEvent::Changed(uri) => self.update(ActionTrigger::DidChange, uri).await,
            WorkspaceEvent::Deleted(uri) => self.remove(ActionTrigger::DidDelete, uri).await,
            WorkspaceEvent::Renamed { from, to } => {
                self.remove(ActionTrigger::DidRename, from).await?;
                self.update(ActionTrigger::DidRename, to).await
            }
        }
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    pub fn pipeline(&self) -> &Arc<IndexPipeline> {
        &self.pipeline
    }
}

/// Builder for [`Workspace`]; collaborators default to the in-memory and
/// tracing-backed implementations.
pub struct WorkspaceBuilder {
    settings: Settings,
    enumerator: Arc<dyn FileEnumerator>,
    provider: Arc<dyn SymbolProvider>,
    cache: Arc<dyn IndexCache>,
    notifier: Arc<dyn Notifier>,
    logger: Arc<dyn IndexLogger>,
    progress_ui: Arc<dyn ProgressUi>,
    queue: Option<Arc<ActionQueue>>,
}

impl WorkspaceBuilder {
    pub fn new(enumerator: Arc<dyn FileEnumerator>, provider: Arc<dyn SymbolProvider>) -> Self {
        Self {
            settings: Settings::default(),
            enumerator,
            provider,
            cache: Arc::new(MemoryCache::new()),
            notifier: Arc::new(TracingNotifier),
            logger: Arc::new(TracingIndexLogger),
            progress_ui: Arc::new(LoggingProgressUi::new()),
            queue: None,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn IndexCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn IndexLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_progress_ui(mut self, progress_ui: Arc<dyn ProgressUi>) -> Self {
        self.progress_ui = progress_ui;
        self
    }

    /// Share an existing queue instead of creating one.
    pub fn with_queue(mut self, queue: Arc<ActionQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build(self) -> Workspace {
        let pipeline = IndexPipeline {
            settings: RwLock::new(self.settings),
            enumerator: self.enumerator,
            provider: self.provider,
            cache: self.cache,
            notifier: self.notifier,
            logger: self.logger,
            progress_ui: self.progress_ui,
            cancel: CancellationFlag::new(),
        };
        Workspace {
            queue: self.queue.unwrap_or_default(),
            pipeline: Arc::new(pipeline),
        }
    }
}
