//! # symbol-types
//!
//! Shared domain types for the symbol index.
//!
//! This crate defines the data structures passed between the scheduler,
//! the indexing pipeline and the picker:
//! - Symbols: the tree a symbol provider returns for one file
//! - Scan results: the raw per-file index built by the scanner
//! - Presented records: flattened, display-ready picker entries
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use symbol_types::{SymbolKind, ScanResult};
//!
//! let result = ScanResult::new();
//! assert_eq!(result.count, 0);
//! assert_eq!(SymbolKind::CLASS.name(), "Class");
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod symbol;

pub use config::{ItemsFilterConfig, PresentationConfig, RetryConfig, Settings};
pub use error::TypesError;
pub use item::{IndexElement, Item, PresentedRecord, ScanResult};
pub use symbol::{DocumentSymbol, Position, Range, SymbolKind, NAME_SPLITTER};
