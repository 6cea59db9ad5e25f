//! Catalog import.
//!
//! One import run reads the configured price-list document, extracts its
//! lines, normalizes them into products and swaps the whole catalog for the
//! result:
//!
//! ```text
//! source file ──▶ extract lines ──▶ normalize ──▶ replace catalog ──▶ history row
//! ```
//!
//! Everything that can fail because of the document (missing file, corrupt
//! container, unsupported type) happens before the store is touched, so a
//! failed run leaves the previous catalog in place. Lines the normalizer
//! drops are counted, never reported individually.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

use cartridge_shop_core::models::ImportRun;
use cartridge_shop_core::normalize::Normalizer;
use cartridge_shop_core::store::ShopStore;

use crate::config::{CatalogConfig, Config};
use crate::db;
use crate::extract;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

#[derive(Debug)]
pub enum ImportError {
    /// The document is missing or unreadable. Nothing was changed.
    SourceUnavailable(String),
    /// The document could not be turned into text. Nothing was changed.
    ExtractionFailure(String),
    /// Writing the new catalog failed.
    PersistenceFailure(String),
}

impl ImportError {
    /// Machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::SourceUnavailable(_) => "source_unavailable",
            ImportError::ExtractionFailure(_) => "extraction_failed",
            ImportError::PersistenceFailure(_) => "persistence_failed",
        }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::SourceUnavailable(msg) => write!(f, "source unavailable: {}", msg),
            ImportError::ExtractionFailure(msg) => write!(f, "extraction failed: {}", msg),
            ImportError::PersistenceFailure(msg) => write!(f, "persistence failed: {}", msg),
        }
    }
}

impl std::error::Error for ImportError {}

/// Summary of one import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub source_hash: String,
    pub lines_seen: usize,
    pub imported: usize,
    pub skipped: usize,
    pub skipped_noise: usize,
    pub skipped_short: usize,
    pub dry_run: bool,
}

/// Builds the normalizer described by the `[catalog]` section.
pub fn normalizer_for(catalog: &CatalogConfig) -> Normalizer {
    Normalizer::with_options(catalog.noise_words.as_slice(), &catalog.default_image)
}

/// Reads and extracts the source document into lines.
///
/// Returns the lines and the SHA-256 of the raw bytes.
pub async fn read_source_lines(source: &Path) -> Result<(Vec<String>, String), ImportError> {
    let bytes = match tokio::fs::read(source).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImportError::SourceUnavailable(format!(
                "{} does not exist",
                source.display()
            )))
        }
        Err(e) => {
            return Err(ImportError::SourceUnavailable(format!(
                "{}: {}",
                source.display(),
                e
            )))
        }
    };

    let content_type = extract::content_type_for_path(source).ok_or_else(|| {
        ImportError::ExtractionFailure(format!(
            "unsupported document type: {}",
            source.display()
        ))
    })?;

    let source_hash = format!("{:x}", Sha256::digest(&bytes));

    let lines = tokio::task::spawn_blocking(move || extract::extract_lines(&bytes, content_type))
        .await
        .map_err(|e| ImportError::ExtractionFailure(e.to_string()))?
        .map_err(|e| ImportError::ExtractionFailure(e.to_string()))?;

    Ok((lines, source_hash))
}

/// Runs one import against `store`.
///
/// With `dry_run` set, the document is parsed and counted but the store is
/// left untouched.
pub async fn import_catalog(
    store: &dyn ShopStore,
    catalog: &CatalogConfig,
    source: &Path,
    dry_run: bool,
) -> Result<ImportReport, ImportError> {
    let started_at = chrono::Utc::now().timestamp();
    let timer = Instant::now();

    let (lines, source_hash) = read_source_lines(source).await?;
    let outcome = normalizer_for(catalog).normalize(&lines);

    let mut report = ImportReport {
        source: source.display().to_string(),
        source_hash,
        lines_seen: outcome.lines_seen,
        imported: outcome.products.len(),
        skipped: outcome.skipped(),
        skipped_noise: outcome.skipped_noise,
        skipped_short: outcome.skipped_short,
        dry_run,
    };

    if dry_run {
        return Ok(report);
    }

    report.imported = store
        .replace_catalog(&outcome.products)
        .await
        .map_err(|e| ImportError::PersistenceFailure(format!("{:#}", e)))?;

    let run = ImportRun {
        source: report.source.clone(),
        source_hash: report.source_hash.clone(),
        lines_seen: report.lines_seen as i64,
        imported: report.imported as i64,
        skipped: report.skipped as i64,
        started_at,
        finished_at: chrono::Utc::now().timestamp(),
    };
    if let Err(e) = store.record_import(&run).await {
        // The catalog is already swapped; only the history entry is lost.
        tracing::warn!("failed to record import history: {:#}", e);
    }

    tracing::info!(
        source = %report.source,
        imported = report.imported,
        skipped = report.skipped,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "catalog imported"
    );

    Ok(report)
}

/// CLI entry point for `shop import`.
pub async fn run_import(config: &Config, source: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let source = source.unwrap_or_else(|| config.catalog.source.clone());

    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;
    let store = SqliteStore::new(pool);

    let result = import_catalog(&store, &config.catalog, &source, dry_run).await;
    store.close().await;
    let report = result?;

    if report.dry_run {
        println!("import {} (dry-run)", report.source);
    } else {
        println!("import {}", report.source);
    }
    println!("  lines read: {}", report.lines_seen);
    println!("  imported: {}", report.imported);
    println!(
        "  skipped: {} (noise: {}, too short: {})",
        report.skipped, report.skipped_noise, report.skipped_short
    );
    println!("  sha256: {}", report.source_hash);
    println!("ok");

    Ok(())
}
