//! Configuration loading for the symbol index.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/symbol-index/config.toml.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::symbol::SymbolKind;

/// Allow/ignore lists deciding which files and symbols get indexed.
///
/// Empty lists impose no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsFilterConfig {
    #[serde(default)]
    pub allowed_kinds: Vec<SymbolKind>,

    #[serde(default)]
    pub ignored_kinds: Vec<SymbolKind>,

    /// Case-insensitive substrings; a match excludes the item.
    #[serde(default)]
    pub ignored_names: Vec<String>,
}

/// Label decoration for presented records.
///
/// Maps are keyed by the numeric kind, written as a string so the
/// table reads the same in TOML, JSON and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationConfig {
    #[serde(default = "default_true")]
    pub should_display_icons: bool,

    #[serde(default)]
    pub should_use_items_filter_phrases: bool,

    #[serde(default = "default_icons")]
    pub icons: BTreeMap<String, String>,

    #[serde(default = "default_filter_phrases")]
    pub items_filter_phrases: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_icons() -> BTreeMap<String, String> {
    [
        (0, "file"),
        (1, "symbol-module"),
        (2, "symbol-namespace"),
        (4, "symbol-class"),
        (5, "symbol-method"),
        (6, "symbol-property"),
        (7, "symbol-field"),
        (8, "symbol-constructor"),
        (9, "symbol-enum"),
        (10, "symbol-interface"),
        (11, "symbol-function"),
        (12, "symbol-variable"),
        (13, "symbol-constant"),
        (22, "symbol-struct"),
    ]
    .into_iter()
    .map(|(kind, icon)| (kind.to_string(), icon.to_string()))
    .collect()
}

fn default_filter_phrases() -> BTreeMap<String, String> {
    [(0, "$$"), (4, "@@"), (5, "!!"), (11, "!!"), (12, "%%"), (13, "%%")]
        .into_iter()
        .map(|(kind, phrase)| (kind.to_string(), phrase.to_string()))
        .collect()
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            should_display_icons: true,
            should_use_items_filter_phrases: false,
            icons: default_icons(),
            items_filter_phrases: default_filter_phrases(),
        }
    }
}

impl PresentationConfig {
    /// Icon token for `kind`, if icons are enabled and one is configured.
    pub fn icon_for(&self, kind: SymbolKind) -> Option<&str> {
        if !self.should_display_icons {
            return None;
        }
        self.icons.get(&kind.0.to_string()).map(String::as_str)
    }

    /// Filter phrase for `kind`, if phrases are enabled and one is configured.
    pub fn filter_phrase_for(&self, kind: SymbolKind) -> Option<&str> {
        if !self.should_use_items_filter_phrases {
            return None;
        }
        self.items_filter_phrases
            .get(&kind.0.to_string())
            .map(String::as_str)
    }
}

/// Bounded retry for symbol providers that are not ready yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 9, so 10 attempts total)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed wait before each retry in milliseconds (default: 120)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    9
}

fn default_backoff_ms() -> u64 {
    120
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Glob patterns selecting files to index, relative to a workspace root
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Glob patterns removing files from the include set
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Symbol fetches dispatched together in one fan-out batch
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Pause before stats are reported so progress UIs can finish
    #[serde(default = "default_stats_delay_ms")]
    pub stats_delay_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub items_filter: ItemsFilterConfig,

    #[serde(default)]
    pub presentation: PresentationConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
    ]
}

fn default_scan_concurrency() -> usize {
    8
}

fn default_stats_delay_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
            items_filter: ItemsFilterConfig::default(),
            presentation: PresentationConfig::default(),
            retry: RetryConfig::default(),
            scan_concurrency: default_scan_concurrency(),
            stats_delay_ms: default_stats_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/symbol-index/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SYMBOL_INDEX_*, nested keys split on `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "symbol-index")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())?
            .set_default("scan_concurrency", default_scan_concurrency() as i64)?
            .set_default("stats_delay_ms", default_stats_delay_ms() as i64)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SYMBOL_INDEX_LOG_LEVEL, SYMBOL_INDEX_RETRY__BACKOFF_MS, ...
        builder = builder.add_source(
            Environment::with_prefix("SYMBOL_INDEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.include.is_empty() {
            return Err(TypesError::Config(
                "include must name at least one pattern".to_string(),
            ));
        }
        if self.scan_concurrency == 0 {
            return Err(TypesError::Config(
                "scan_concurrency must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stats_delay(&self) -> Duration {
        Duration::from_millis(self.stats_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.include, vec!["**/*"]);
        assert_eq!(settings.retry.max_retries, 9);
        assert_eq!(settings.retry.backoff(), Duration::from_millis(120));
        assert_eq!(settings.stats_delay(), Duration::from_millis(250));
        assert!(settings.items_filter.allowed_kinds.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
include = ["src/**/*.ts"]
scan_concurrency = 2

[items_filter]
allowed_kinds = [4, 5]
ignored_names = ["test"]

[retry]
max_retries = 3
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.include, vec!["src/**/*.ts"]);
        assert_eq!(settings.scan_concurrency, 2);
        assert_eq!(
            settings.items_filter.allowed_kinds,
            vec![SymbolKind::CLASS, SymbolKind::METHOD]
        );
        assert_eq!(settings.items_filter.ignored_names, vec!["test"]);
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.retry.backoff_ms, 120);
    }

    #[test]
    fn test_missing_cli_config_is_an_error() {
        let result = Settings::load(Some("/definitely/not/here/config.toml"));
        assert!(matches!(result, Err(TypesError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let settings = Settings {
            scan_concurrency: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_icon_lookup() {
        let mut presentation = PresentationConfig::default();
        assert_eq!(presentation.icon_for(SymbolKind::CLASS), Some("symbol-class"));
        assert_eq!(presentation.icon_for(SymbolKind(17)), None);

        presentation.should_display_icons = false;
        assert_eq!(presentation.icon_for(SymbolKind::CLASS), None);
    }

    #[test]
    fn test_filter_phrase_lookup() {
        let mut presentation = PresentationConfig::default();
        assert_eq!(presentation.filter_phrase_for(SymbolKind::CLASS), None);

        presentation.should_use_items_filter_phrases = true;
        assert_eq!(presentation.filter_phrase_for(SymbolKind::CLASS), Some("@@"));
        assert_eq!(presentation.filter_phrase_for(SymbolKind::FILE), Some("$$"));
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let decoded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, settings);
    }
}
