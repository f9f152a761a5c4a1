//! File discovery and per-file symbol scanning.
//!
//! The scanner turns a workspace (or an explicit list of files) into a
//! raw [`ScanResult`]. Symbol fetches are dispatched in batches of
//! `scan_concurrency` files and awaited together; the cancellation flag
//! is checked before each file is dispatched and before each fetched
//! file is added to the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use symbol_types::{DocumentSymbol, IndexElement, ScanResult, Settings};
use tracing::{debug, info, warn};

use crate::cancel::CancellationFlag;
use crate::extractor::SymbolExtractor;
use crate::filter::ItemFilter;
use crate::provider::{FileEnumerator, SymbolProvider};
use crate::sink::Notifier;

/// Callback fired once per scanned file with the total number of files
/// in this scan.
pub type FileScannedCallback<'a> = &'a (dyn Fn(usize) + Send + Sync);

/// Scanner configuration taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub filter: ItemFilter,
    pub extractor: SymbolExtractor,
    /// Files dispatched together per fan-out batch.
    pub concurrency: usize,
}

impl ScannerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include: settings.include.clone(),
            exclude: settings.exclude.clone(),
            filter: ItemFilter::new(&settings.items_filter),
            extractor: SymbolExtractor::new(settings.retry),
            concurrency: settings.scan_concurrency.max(1),
        }
    }

    /// Set the fan-out batch size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Builds raw scan results from the workspace.
pub struct Scanner {
    config: ScannerConfig,
    enumerator: Arc<dyn FileEnumerator>,
    provider: Arc<dyn SymbolProvider>,
    notifier: Arc<dyn Notifier>,
}

impl Scanner {
    pub fn new(
        config: ScannerConfig,
        enumerator: Arc<dyn FileEnumerator>,
        provider: Arc<dyn SymbolProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            enumerator,
            provider,
            notifier,
        }
    }

    /// Scan `uris`, or the whole workspace when `uris` is absent or empty.
    ///
    /// Returns an empty result if `cancel` is observed; the flag is left
    /// set so the presenter sees it too.
    pub async fn scan(
        &self,
        uris: Option<&[PathBuf]>,
        cancel: &CancellationFlag,
        on_file_scanned: FileScannedCallback<'_>,
    ) -> ScanResult {
        let files = match uris {
            Some(uris) if !uris.is_empty() => uris.to_vec(),
            _ => self.discover().await,
        };
        let total = files.len();
        debug!(files = total, concurrency = self.config.concurrency, "Scanning files");

        let mut result = ScanResult::new();
        for batch in files.chunks(self.config.concurrency) {
            let dispatched: Vec<&PathBuf> = batch
                .iter()
                .take_while(|_| !cancel.is_cancelled())
                .collect();

            // In-flight fetches always complete; cancellation only
            // discards their results.
            let fetched = join_all(
                dispatched
                    .iter()
                    .map(|path| self.config.extractor.extract(self.provider.as_ref(), path)),
            )
            .await;

            for (path, symbols) in dispatched.into_iter().zip(fetched) {
                if cancel.is_cancelled() {
                    return aborted(result);
                }
                self.collect(&mut result, path, symbols);
                on_file_scanned(total);
            }

            if cancel.is_cancelled() {
                return aborted(result);
            }
        }

        result
    }

    async fn discover(&self) -> Vec<PathBuf> {
        match self
            .enumerator
            .find_files(&self.config.include, &self.config.exclude)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "File enumeration failed, continuing with no files");
                self.notifier.print_error_message(&e.to_string());
                Vec::new()
            }
        }
    }

    fn collect(&self, result: &mut ScanResult, path: &Path, symbols: Vec<DocumentSymbol>) {
        let filter = &self.config.filter;
        if filter.is_file_eligible(path) {
            result.push(path, IndexElement::File(path.to_path_buf()));
        }
        for symbol in symbols {
            if filter.is_symbol_eligible(&symbol) {
                result.push(path, IndexElement::Symbol(symbol));
            }
        }
    }
}

fn aborted(mut result: ScanResult) -> ScanResult {
    info!(discarded = result.count, "Scan cancelled");
    result.clear();
    result
}
