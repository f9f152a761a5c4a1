//! Upstream collaborators: file enumeration and symbol queries.
//!
//! The pipeline only sees these traits. [`FsFileEnumerator`] walks local
//! folders; symbol providers are supplied by the host (a language server
//! bridge, a parser, or a scripted provider in tests).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use symbol_types::DocumentSymbol;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::IndexingError;

/// Per-file symbol query.
#[async_trait]
pub trait SymbolProvider: Send + Sync {
    /// Symbols of `path`, possibly nested.
    ///
    /// `None` means the provider is not ready for this file yet and the
    /// query should be retried; `Some(vec![])` means the file has no symbols.
    async fn document_symbols(&self, path: &Path) -> Option<Vec<DocumentSymbol>>;
}

/// Workspace folders and glob-based file discovery.
#[async_trait]
pub trait FileEnumerator: Send + Sync {
    /// Root folders of the workspace. Empty when nothing is open.
    fn workspace_folders(&self) -> Vec<PathBuf>;

    /// Files below the workspace folders matching any `include` pattern
    /// and no `exclude` pattern.
    async fn find_files(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, IndexingError>;

    /// Whether `path` names a folder rather than a file.
    async fn is_folder(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
    }

    /// Selected files below `folder`.
    async fn find_files_in(
        &self,
        folder: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, IndexingError> {
        let mut files = self.find_files(include, exclude).await?;
        files.retain(|file| file.starts_with(folder));
        Ok(files)
    }
}

/// Provider that knows no symbols; produces a file-only index.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbolProvider;

#[async_trait]
impl SymbolProvider for NoSymbolProvider {
    async fn document_symbols(&self, _path: &Path) -> Option<Vec<DocumentSymbol>> {
        Some(Vec::new())
    }
}

/// Local filesystem enumerator.
///
/// Patterns are matched against paths relative to each root.
#[derive(Debug, Clone)]
pub struct FsFileEnumerator {
    roots: Vec<PathBuf>,
}

impl FsFileEnumerator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn single(root: impl Into<PathBuf>) -> Self {
        Self::new(vec![root.into()])
    }

    /// Walk each `(root, start)` pair on a blocking thread.
    async fn walk(
        &self,
        targets: Vec<(PathBuf, PathBuf)>,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, IndexingError> {
        let include = compile_patterns(include)?;
        let exclude = compile_patterns(exclude)?;

        tokio::task::spawn_blocking(move || walk_roots(&targets, &include, &exclude)).await?
    }
}

#[async_trait]
impl FileEnumerator for FsFileEnumerator {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    async fn find_files(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, IndexingError> {
        let targets = self.roots.iter().map(|root| (root.clone(), root.clone())).collect();
        self.walk(targets, include, exclude).await
    }

    /// Walks only `folder`, matching paths relative to the root that
    /// contains it.
    async fn find_files_in(
        &self,
        folder: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, IndexingError> {
        let targets = self
            .roots
            .iter()
            .filter(|root| folder.starts_with(root))
            .map(|root| (root.clone(), folder.to_path_buf()))
            .collect();
        self.walk(targets, include, exclude).await
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, IndexingError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| IndexingError::Pattern {
                pattern: pattern.clone(),
                message: e.msg.to_string(),
            })
        })
        .collect()
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn walk_roots(
    targets: &[(PathBuf, PathBuf)],
    include: &[Pattern],
    exclude: &[Pattern],
) -> Result<Vec<PathBuf>, IndexingError> {
    let options = match_options();
    let mut files = Vec::new();

    for (root, start) in targets {
        for entry in WalkDir::new(start).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                // The start folder itself is unreadable: nothing below it can be indexed.
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if is_selected(relative, include, exclude, options) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!(folders = targets.len(), files = files.len(), "Enumerated workspace files");
    Ok(files)
}

/// Whether `path` lies below one of `roots` and is selected by the
/// include/exclude patterns, matched the way [`FsFileEnumerator`] does.
pub fn is_path_selected(
    path: &Path,
    roots: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> Result<bool, IndexingError> {
    let include = compile_patterns(include)?;
    let exclude = compile_patterns(exclude)?;
    let options = match_options();

    Ok(roots.iter().any(|root| {
        path.strip_prefix(root)
            .map(|relative| is_selected(relative, &include, &exclude, options))
            .unwrap_or(false)
    }))
}

fn is_selected(relative: &Path, include: &[Pattern], exclude: &[Pattern], options: MatchOptions) -> bool {
    let matches = |pattern: &Pattern| pattern.matches_path_with(relative, options);
    include.iter().any(matches) && !exclude.iter().any(matches)
}
