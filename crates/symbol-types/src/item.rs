//! Raw scan results and display-ready records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::symbol::{DocumentSymbol, Range, SymbolKind};

/// One indexed element of a file: the file itself or one of its symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IndexElement {
    File(PathBuf),
    Symbol(DocumentSymbol),
}

/// All indexed elements of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub uri: PathBuf,
    pub elements: Vec<IndexElement>,
}

impl Item {
    pub fn new(uri: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            elements: Vec::new(),
        }
    }
}

/// Raw in-memory index produced by one scan.
///
/// `count` always equals the total number of elements across items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub items: BTreeMap<PathBuf, Item>,
    pub count: usize,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element under `uri`, creating the item on first use.
    pub fn push(&mut self, uri: &Path, element: IndexElement) {
        self.items
            .entry(uri.to_path_buf())
            .or_insert_with(|| Item::new(uri))
            .elements
            .push(element);
        self.count += 1;
    }

    /// Drop everything collected so far.
    pub fn clear(&mut self) {
        self.items.clear();
        self.count = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of files with at least one element.
    pub fn file_count(&self) -> usize {
        self.items.len()
    }
}

/// Display-ready picker entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentedRecord {
    pub uri: PathBuf,
    pub symbol_kind: SymbolKind,
    pub range: Range,
    pub label: String,
    pub description: String,
    pub detail: String,
}

impl PresentedRecord {
    /// Whether the record belongs to `path`, or to a file below it when
    /// `path` names a folder.
    pub fn belongs_to(&self, path: &Path) -> bool {
        self.uri.starts_with(path)
    }
}
