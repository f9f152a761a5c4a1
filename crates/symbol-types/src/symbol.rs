//! Symbol model shared by providers, the scanner and the presenter.
//!
//! Kinds use the editor's numbering, with `0` reserved for files so that
//! files and symbols can go through the same eligibility filter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter placed between the top-level ancestor name and a nested
/// symbol's own name when a symbol tree is flattened.
pub const NAME_SPLITTER: &str = "§&§";

const KIND_NAMES: [&str; 26] = [
    "File",
    "Module",
    "Namespace",
    "Package",
    "Class",
    "Method",
    "Property",
    "Field",
    "Constructor",
    "Enum",
    "Interface",
    "Function",
    "Variable",
    "Constant",
    "String",
    "Number",
    "Boolean",
    "Array",
    "Object",
    "Key",
    "Null",
    "EnumMember",
    "Struct",
    "Event",
    "Operator",
    "TypeParameter",
];

/// Numeric symbol kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolKind(pub u32);

impl SymbolKind {
    pub const FILE: SymbolKind = SymbolKind(0);
    pub const MODULE: SymbolKind = SymbolKind(1);
    pub const NAMESPACE: SymbolKind = SymbolKind(2);
    pub const PACKAGE: SymbolKind = SymbolKind(3);
    pub const CLASS: SymbolKind = SymbolKind(4);
    pub const METHOD: SymbolKind = SymbolKind(5);
    pub const PROPERTY: SymbolKind = SymbolKind(6);
    pub const FIELD: SymbolKind = SymbolKind(7);
    pub const CONSTRUCTOR: SymbolKind = SymbolKind(8);
    pub const ENUM: SymbolKind = SymbolKind(9);
    pub const INTERFACE: SymbolKind = SymbolKind(10);
    pub const FUNCTION: SymbolKind = SymbolKind(11);
    pub const VARIABLE: SymbolKind = SymbolKind(12);
    pub const CONSTANT: SymbolKind = SymbolKind(13);
    pub const STRUCT: SymbolKind = SymbolKind(22);
    pub const TYPE_PARAMETER: SymbolKind = SymbolKind(25);

    /// Display name of the kind, `Unknown` for values outside the table.
    pub fn name(&self) -> &'static str {
        KIND_NAMES.get(self.0 as usize).copied().unwrap_or("Unknown")
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open text range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range spanning whole lines `start_line..=end_line`.
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start: Position::new(start_line, 0),
            end: Position::new(end_line, 0),
        }
    }

    /// Whether start and end fall on the same line.
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

/// A symbol as returned by a symbol provider, possibly with children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSymbol {
    /// Symbol name; composed as `<ancestor><splitter><name>` once flattened
    pub name: String,
    /// Provider supplied detail (signature, type, ...)
    #[serde(default)]
    pub detail: String,
    pub kind: SymbolKind,
    pub range: Range,
    #[serde(default)]
    pub children: Vec<DocumentSymbol>,
}

impl DocumentSymbol {
    /// Create a childless symbol.
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: Range) -> Self {
        Self {
            name: name.into(),
            detail: String::new(),
            kind,
            range,
            children: Vec::new(),
        }
    }

    /// Append a child symbol.
    pub fn with_child(mut self, child: DocumentSymbol) -> Self {
        self.children.push(child);
        self
    }

    /// Split a composed name into `(parent, own name)`.
    ///
    /// Names without a splitter have no parent.
    pub fn split_name(&self) -> (Option<&str>, &str) {
        match self.name.split_once(NAME_SPLITTER) {
            Some((parent, own)) => (Some(parent), own),
            None => (None, self.name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(SymbolKind::FILE.name(), "File");
        assert_eq!(SymbolKind::CLASS.name(), "Class");
        assert_eq!(SymbolKind::TYPE_PARAMETER.name(), "TypeParameter");
        assert_eq!(SymbolKind(99).name(), "Unknown");
        assert_eq!(SymbolKind(0), SymbolKind::FILE);
    }

    #[test]
    fn test_kind_serializes_as_number() {
        let json = serde_json::to_string(&SymbolKind::METHOD).unwrap();
        assert_eq!(json, "5");
        let kind: SymbolKind = serde_json::from_str("11").unwrap();
        assert_eq!(kind, SymbolKind::FUNCTION);
    }

    #[test]
    fn test_split_name() {
        let plain = DocumentSymbol::new("Widget", SymbolKind::CLASS, Range::default());
        assert_eq!(plain.split_name(), (None, "Widget"));

        let nested = DocumentSymbol::new(
            format!("Widget{}render", NAME_SPLITTER),
            SymbolKind::METHOD,
            Range::default(),
        );
        assert_eq!(nested.split_name(), (Some("Widget"), "render"));
    }

    #[test]
    fn test_range_single_line() {
        assert!(Range::lines(3, 3).is_single_line());
        assert!(!Range::lines(3, 7).is_single_line());
    }
}
