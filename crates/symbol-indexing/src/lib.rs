//! Cancellable incremental indexing pipeline for the symbol index.
//!
//! This crate turns a workspace into display-ready picker records and
//! keeps them current as files change. All work runs as actions on the
//! coalescing queue from `symbol-scheduler`.
//!
//! ## Key Components
//!
//! - [`ItemFilter`]: allow/ignore predicate for files and symbols
//! - [`SymbolExtractor`]: per-file symbol query with bounded retry, then flattening
//! - [`Scanner`]: file discovery and concurrent symbol scanning into a [`ScanResult`]
//! - [`present`]: raw scan result to [`PresentedRecord`] conversion
//! - [`Workspace`]: queues full and incremental passes and reports progress and stats
//! - [`CancellationFlag`]: cooperative abort signal shared by scanner and presenter
//!
//! ## Collaborators
//!
//! Hosts plug in a [`FileEnumerator`], a [`SymbolProvider`], an
//! [`IndexCache`], a [`Notifier`], an [`IndexLogger`] and a [`ProgressUi`].
//! Filesystem, in-memory and tracing-backed defaults are provided.
//!
//! ## Example
//!
//! ```ignore
//! use symbol_indexing::{FsFileEnumerator, NoSymbolProvider, Workspace, WorkspaceEvent};
//!
//! let workspace = Workspace::builder(
//!     Arc::new(FsFileEnumerator::single("/path/to/project")),
//!     Arc::new(NoSymbolProvider),
//! )
//! .with_settings(settings)
//! .build();
//!
//! workspace.handle_event(WorkspaceEvent::Startup).await?;
//! let records = workspace.pipeline().cache().records();
//! ```
//!
//! [`ScanResult`]: symbol_types::ScanResult
//! [`PresentedRecord`]: symbol_types::PresentedRecord

pub mod cancel;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod presenter;
pub mod progress;
pub mod provider;
pub mod scanner;
pub mod sink;
pub mod workspace;

pub use cancel::CancellationFlag;
pub use error::IndexingError;
pub use extractor::{flatten_symbols, SymbolExtractor};
pub use filter::ItemFilter;
pub use presenter::{present, present_element};
pub use progress::{
    LoggingProgressReporter, LoggingProgressUi, NoOpProgressReporter, ProgressHandle,
    ProgressReporter, ProgressState, ProgressUi, ProgressUpdate,
};
pub use provider::{is_path_selected, FileEnumerator, FsFileEnumerator, NoSymbolProvider, SymbolProvider};
pub use scanner::{FileScannedCallback, Scanner, ScannerConfig};
pub use sink::{
    IndexCache, IndexLogger, IndexStats, MemoryCache, Notifier, TracingIndexLogger, TracingNotifier,
};
pub use workspace::{IndexPipeline, Workspace, WorkspaceBuilder, WorkspaceEvent};
