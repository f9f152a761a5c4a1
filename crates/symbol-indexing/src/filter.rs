//! Eligibility predicate for files and symbols.

use std::path::Path;

use symbol_types::{DocumentSymbol, ItemsFilterConfig, SymbolKind};

/// Allow/ignore filter built from [`ItemsFilterConfig`].
///
/// Ignored names are lowercased once here so each check is a plain
/// substring search.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    allowed_kinds: Vec<SymbolKind>,
    ignored_kinds: Vec<SymbolKind>,
    ignored_names: Vec<String>,
}

impl ItemFilter {
    pub fn new(config: &ItemsFilterConfig) -> Self {
        Self {
            allowed_kinds: config.allowed_kinds.clone(),
            ignored_kinds: config.ignored_kinds.clone(),
            ignored_names: config
                .ignored_names
                .iter()
                .filter(|name| !name.is_empty())
                .map(|name| name.to_lowercase())
                .collect(),
        }
    }

    /// Whether an item of `kind` named `name` may be indexed.
    pub fn is_eligible(&self, kind: SymbolKind, name: &str) -> bool {
        self.is_kind_allowed(kind) && !self.is_kind_ignored(kind) && !self.is_name_ignored(name)
    }

    /// Files are filtered as kind `File` under their file name.
    pub fn is_file_eligible(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        self.is_eligible(SymbolKind::FILE, &name)
    }

    pub fn is_symbol_eligible(&self, symbol: &DocumentSymbol) -> bool {
        self.is_eligible(symbol.kind, &symbol.name)
    }

    fn is_kind_allowed(&self, kind: SymbolKind) -> bool {
        self.allowed_kinds.is_empty() || self.allowed_kinds.contains(&kind)
    }

    fn is_kind_ignored(&self, kind: SymbolKind) -> bool {
        self.ignored_kinds.contains(&kind)
    }

    fn is_name_ignored(&self, name: &str) -> bool {
        if self.ignored_names.is_empty() {
            return false;
        }
        let name = name.to_lowercase();
        self.ignored_names.iter().any(|ignored| name.contains(ignored.as_str()))
    }
}
