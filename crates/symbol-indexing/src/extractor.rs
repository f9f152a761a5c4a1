//! Per-file symbol extraction: bounded retry, then flattening.

use std::path::Path;

use symbol_types::{DocumentSymbol, RetryConfig, NAME_SPLITTER};
use tracing::{debug, trace};

use crate::provider::SymbolProvider;

/// Fetches and flattens the symbols of single files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolExtractor {
    retry: RetryConfig,
}

impl SymbolExtractor {
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    /// Query `provider` for `path`, retrying while it reports "not ready".
    ///
    /// The first attempt runs immediately; each retry waits the fixed
    /// backoff. Exhausting the retries yields an empty list.
    pub async fn fetch(&self, provider: &dyn SymbolProvider, path: &Path) -> Vec<DocumentSymbol> {
        let mut attempt = 0;
        loop {
            if let Some(symbols) = provider.document_symbols(path).await {
                trace!(path = %path.display(), attempt, symbols = symbols.len(), "Fetched symbols");
                return symbols;
            }
            if attempt >= self.retry.max_retries {
                debug!(
                    path = %path.display(),
                    attempts = attempt + 1,
                    "Symbol provider never became ready, indexing file without symbols"
                );
                return Vec::new();
            }
            attempt += 1;
            tokio::time::sleep(self.retry.backoff()).await;
        }
    }

    /// Fetch and flatten in one step.
    pub async fn extract(&self, provider: &dyn SymbolProvider, path: &Path) -> Vec<DocumentSymbol> {
        flatten_symbols(self.fetch(provider, path).await)
    }
}

/// Flatten a symbol tree depth-first.
///
/// Nested symbols are renamed `<top-level ancestor><splitter><own name>`;
/// every returned symbol has no children.
pub fn flatten_symbols(symbols: Vec<DocumentSymbol>) -> Vec<DocumentSymbol> {
    let mut flat = Vec::new();
    for symbol in symbols {
        push_flattened(symbol, None, &mut flat);
    }
    flat
}

fn push_flattened(mut symbol: DocumentSymbol, root: Option<&str>, out: &mut Vec<DocumentSymbol>) {
    let children = std::mem::take(&mut symbol.children);
    let top = root.map(str::to_owned).unwrap_or_else(|| symbol.name.clone());

    if let Some(root) = root {
        symbol.name = format!("{root}{NAME_SPLITTER}{}", symbol.name);
    }
    out.push(symbol);

    for child in children {
        push_flattened(child, Some(&top), out);
    }
}
