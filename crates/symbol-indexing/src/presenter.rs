//! Conversion of raw scan results into picker records.

use std::path::Path;

use symbol_types::{
    DocumentSymbol, IndexElement, PresentationConfig, PresentedRecord, Range, ScanResult, SymbolKind,
};
use tracing::info;

use crate::cancel::CancellationFlag;

/// Map every element of `result` to a [`PresentedRecord`].
///
/// `cancel` is checked once per file. When it is set the flag is reset
/// and an empty list is returned.
pub fn present(
    result: &ScanResult,
    config: &PresentationConfig,
    cancel: &CancellationFlag,
) -> Vec<PresentedRecord> {
    let mut records = Vec::with_capacity(result.count);

    for item in result.items.values() {
        if cancel.is_cancelled() {
            info!(converted = records.len(), "Presentation cancelled");
            cancel.reset();
            return Vec::new();
        }
        records.extend(
            item.elements
                .iter()
                .map(|element| present_element(&item.uri, element, config)),
        );
    }

    records
}

/// Map a single element of the file at `uri`.
pub fn present_element(uri: &Path, element: &IndexElement, config: &PresentationConfig) -> PresentedRecord {
    match element {
        IndexElement::File(path) => file_record(path, config),
        IndexElement::Symbol(symbol) => symbol_record(uri, symbol, config),
    }
}

fn file_record(path: &Path, config: &PresentationConfig) -> PresentedRecord {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    PresentedRecord {
        uri: path.to_path_buf(),
        symbol_kind: SymbolKind::FILE,
        range: Range::default(),
        label: decorate(name, SymbolKind::FILE, config),
        description: SymbolKind::FILE.name().to_string(),
        detail: path.display().to_string(),
    }
}

fn symbol_record(uri: &Path, symbol: &DocumentSymbol, config: &PresentationConfig) -> PresentedRecord {
    let (parent, own_name) = symbol.split_name();

    PresentedRecord {
        uri: uri.to_path_buf(),
        symbol_kind: symbol.kind,
        range: symbol.range,
        label: decorate(own_name.to_string(), symbol.kind, config),
        description: describe(symbol.kind, &symbol.range, parent),
        detail: uri.display().to_string(),
    }
}

/// `"<Kind> at line: N"` or `"<Kind> at lines: N - M"`, 1-based, plus
/// `" in <parent>"` for nested symbols.
fn describe(kind: SymbolKind, range: &Range, parent: Option<&str>) -> String {
    let start = range.start.line + 1;
    let end = range.end.line + 1;

    let mut description = if range.is_single_line() {
        format!("{} at line: {start}", kind.name())
    } else {
        format!("{} at lines: {start} - {end}", kind.name())
    };
    if let Some(parent) = parent {
        description.push_str(" in ");
        description.push_str(parent);
    }
    description
}

fn decorate(label: String, kind: SymbolKind, config: &PresentationConfig) -> String {
    let label = match config.icon_for(kind) {
        Some(icon) => format!("$({icon})  {label}"),
        None => label,
    };
    match config.filter_phrase_for(kind) {
        Some(phrase) => format!("[{phrase}] {label}"),
        None => label,
    }
}
