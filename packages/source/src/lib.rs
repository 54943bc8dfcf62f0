#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loader for per-city school safety sources.
//!
//! A data directory holds three JSON tables per city (overall, pedestrian,
//! final). [`load_all_cities`] discovers them, checks that every city is
//! complete, merges each city into [`SchoolSafetyRecord`]s, and returns the
//! concatenated [`AggregatedDataset`].
//!
//! Any loader error aborts the whole run: a partial dataset on a safety
//! dashboard is worse than none.
//!
//! [`SchoolSafetyRecord`]: school_safety_school_models::SchoolSafetyRecord

pub mod discovery;
pub mod merge;
pub mod parsing;
pub mod progress;
pub mod table;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use school_safety_school_models::AggregatedDataset;
use school_safety_source_models::SourceCategory;

use crate::discovery::{CitySourceBundle, discover_sources, group_by_city};
use crate::merge::{CityTables, merge_city};
use crate::progress::{ProgressCallback, null_progress};
use crate::table::RawTable;

/// Errors that abort dataset construction.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The data directory does not exist or is not a directory.
    #[error("Source directory not found: {}", .path.display())]
    SourceDirectoryNotFound {
        /// The directory that was requested.
        path: PathBuf,
    },

    /// A city is missing one of its three category files.
    #[error("City '{city}' is missing its '{missing}' source file")]
    IncompleteCityData {
        /// Canonical city name.
        city: String,
        /// The first missing category.
        missing: SourceCategory,
    },

    /// Two files claim the same city and category.
    #[error(
        "City '{city}' has more than one '{category}' source file: {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateSource {
        /// Canonical city name.
        city: String,
        /// The duplicated category.
        category: SourceCategory,
        /// The file seen first.
        first: PathBuf,
        /// The conflicting file.
        second: PathBuf,
    },

    /// A secondary table's row count differs from the overall table's.
    #[error(
        "City '{city}': '{category}' table has {actual} rows but the overall table has {expected}"
    )]
    RowAlignment {
        /// Canonical city name.
        city: String,
        /// The misaligned category.
        category: SourceCategory,
        /// Overall table row count.
        expected: usize,
        /// Secondary table row count.
        actual: usize,
    },

    /// A school in the overall table has no partner in a secondary table.
    #[error("City '{city}': school '{school_name}' has no matching row in the '{category}' table")]
    UnmatchedSchool {
        /// Canonical city name.
        city: String,
        /// The category without a match.
        category: SourceCategory,
        /// The unmatched school.
        school_name: String,
    },

    /// The file is JSON but neither a records array nor a columns object.
    #[error("{}: unsupported table layout ({reason})", .path.display())]
    UnsupportedLayout {
        /// Offending file.
        path: PathBuf,
        /// What was found instead.
        reason: String,
    },

    /// A required column does not appear in any row.
    #[error("{}: missing column '{column}'", .path.display())]
    MissingColumn {
        /// Offending file.
        path: PathBuf,
        /// The absent column.
        column: String,
    },

    /// A required cell is missing or null.
    #[error("{}: row {row} is missing required field '{field}'", .path.display())]
    MissingField {
        /// Offending file.
        path: PathBuf,
        /// Zero-based row index.
        row: usize,
        /// The missing field.
        field: String,
    },

    /// A cell could not be coerced to the expected type.
    #[error("{}: row {row} field '{field}': {message}", .path.display())]
    InvalidField {
        /// Offending file.
        path: PathBuf,
        /// Zero-based row index.
        row: usize,
        /// The offending field.
        field: String,
        /// What was wrong with the value.
        message: String,
    },

    /// I/O error while listing or reading sources.
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A source file is not valid JSON.
    #[error("JSON parse error in {}: {source}", .path.display())]
    Json {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Loads and merges every city in `dir`.
///
/// # Errors
///
/// Returns the first [`LoadError`] encountered; no partial dataset is
/// produced.
pub fn load_all_cities(dir: &Path) -> Result<AggregatedDataset, LoadError> {
    load_all_cities_with_progress(dir, &null_progress())
}

/// Same as [`load_all_cities`], reporting one progress unit per city.
///
/// Every bundle is checked for completeness before any table is read, so
/// an incomplete city fails fast regardless of its position.
///
/// # Errors
///
/// Returns the first [`LoadError`] encountered.
pub fn load_all_cities_with_progress(
    dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AggregatedDataset, LoadError> {
    log::info!("Scanning {} for city source files...", dir.display());
    let files = discover_sources(dir)?;
    let bundles = group_by_city(files)?;

    for (city, bundle) in &bundles {
        if let Some(missing) = bundle.missing() {
            return Err(LoadError::IncompleteCityData {
                city: city.clone(),
                missing,
            });
        }
    }

    if bundles.is_empty() {
        log::warn!("No city source files found in {}", dir.display());
    }

    progress.set_total(bundles.len() as u64);

    let mut records = Vec::new();
    for (city, bundle) in &bundles {
        progress.set_message(format!("Merging {city}"));

        let tables = read_bundle(city, bundle)?;
        let merged = merge_city(city, &tables)?;
        log::info!("Merged {} schools for {city}", merged.len());

        records.extend(merged);
        progress.inc(1);
    }

    let dataset = AggregatedDataset::new(records);
    progress.finish(format!(
        "Loaded {} schools from {} cities",
        dataset.len(),
        bundles.len()
    ));
    log::info!(
        "Loaded {} schools from {} cities",
        dataset.len(),
        bundles.len()
    );
    Ok(dataset)
}

fn read_bundle(city: &str, bundle: &CitySourceBundle) -> Result<CityTables, LoadError> {
    let read = |category| {
        let path = bundle
            .get(category)
            .ok_or_else(|| LoadError::IncompleteCityData {
                city: city.to_string(),
                missing: category,
            })?;
        RawTable::read(path)
    };

    Ok(CityTables {
        overall: read(SourceCategory::Overall)?,
        pedestrian: read(SourceCategory::Pedestrian)?,
        infrastructure: read(SourceCategory::Final)?,
    })
}
