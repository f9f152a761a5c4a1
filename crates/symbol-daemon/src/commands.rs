//! Command implementations for the symbol index CLI.
//!
//! Handles:
//! - index: Run one queued rebuild over a directory and dump the records
//! - config: Print the effective settings

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use symbol_indexing::{FsFileEnumerator, IndexCache, MemoryCache, NoSymbolProvider, Workspace};
use symbol_scheduler::ActionTrigger;
use symbol_types::{PresentedRecord, Settings};

/// Load settings and apply the CLI log level override.
pub fn load_settings(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Index `root` once and write the records as pretty JSON to `output`
/// (or stdout).
///
/// Non-empty `include` replaces the configured include list; `exclude`
/// extends the configured exclude list.
pub async fn run_index(
    mut settings: Settings,
    root: &Path,
    output: Option<&Path>,
    include: Vec<String>,
    exclude: Vec<String>,
) -> Result<Vec<PresentedRecord>> {
    if !root.is_dir() {
        bail!("Workspace root {} is not a directory", root.display());
    }
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", root.display()))?;

    if !include.is_empty() {
        settings.include = include;
    }
    settings.exclude.extend(exclude);
    settings.validate().context("Invalid configuration")?;

    info!("Indexing {}", root.display());
    info!("  Include: {:?}", settings.include);
    info!("  Exclude: {:?}", settings.exclude);

    let cache = Arc::new(MemoryCache::new());
    let workspace = Workspace::builder(
        Arc::new(FsFileEnumerator::single(root)),
        Arc::new(NoSymbolProvider),
    )
    .with_settings(settings)
    .with_cache(cache.clone())
    .build();

    workspace
        .index(ActionTrigger::Startup)
        .await
        .context("Indexing failed")?;

    let records = cache.records();
    let json = serde_json::to_string_pretty(&records).context("Failed to encode records")?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} records to {}", records.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write records")?;
        }
    }

    Ok(records)
}

/// Render the effective settings as TOML.
pub fn show_config(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to encode configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_config_roundtrip() {
        let settings = Settings::default();
        let rendered = show_config(&settings).unwrap();

        assert!(rendered.contains("scan_concurrency = 8"));
        let decoded: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(decoded, settings);
    }

    #[test]
    fn test_load_settings_applies_log_level() {
        let settings = load_settings(None, Some("trace")).unwrap();
        assert_eq!(settings.log_level, "trace");
    }

    #[tokio::test]
    async fn test_run_index_rejects_missing_root() {
        let err = run_index(
            Settings::default(),
            Path::new("/definitely/not/a/workspace"),
            None,
            Vec::new(),
            Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }
}
