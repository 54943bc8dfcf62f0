#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map, export, and summary generation for the school safety dataset.
//!
//! The map is a single self-contained HTML document (Leaflet from CDN,
//! data inline) written to `data/generated/all_cities_safety_map.html`.
//! Exports are JSON record arrays in the same directory. Summaries are
//! plain-text tables printed to stdout.
//!
//! Each entry point loads the dataset fresh from the data directory; there
//! is no cache between runs.

pub mod config;
pub mod html;
pub mod interactive;
pub mod map;
pub mod report;
pub mod template;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use school_safety_analytics::AnalyticsError;
use school_safety_analytics::export::write_export;
use school_safety_school_models::AggregatedDataset;
use school_safety_source::progress::{ProgressCallback, null_progress};
use school_safety_source::{LoadError, load_all_cities_with_progress};
use thiserror::Error;

use crate::config::{ConfigError, MapConfig};
use crate::map::{RenderReport, render_map_with_progress};

/// File name of the rendered map inside the output directory.
pub const OUTPUT_FILE_NAME: &str = "all_cities_safety_map.html";

/// Default number of rows in "top N" tables.
pub const DEFAULT_TOP: usize = 10;

/// Errors that can occur while generating outputs.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The map configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing an output file failed.
    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Layer data could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The dataset could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Writing an export failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// A city selection matched no records.
    #[error("Unknown city '{city}'. Available: {available}")]
    UnknownCity {
        /// The requested city.
        city: String,
        /// Comma-separated list of loaded cities.
        available: String,
    },
}

fn workspace_root() -> &'static Path {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.ancestors().nth(2).unwrap_or(manifest)
}

/// Returns the default input directory, `<workspace>/data`.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR` so the path does not
/// depend on the caller's working directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    workspace_root().join("data")
}

/// Returns the default output directory, `<workspace>/data/generated`.
#[must_use]
pub fn output_dir() -> PathBuf {
    workspace_root().join("data/generated")
}

/// Arguments shared by the map subcommand and the interactive menus.
#[derive(Debug, Clone)]
pub struct MapArgs {
    /// Directory holding the per-city JSON files.
    pub data_dir: PathBuf,
    /// Directory the map is written to.
    pub output_dir: PathBuf,
    /// Optional TOML file merged over the embedded defaults.
    pub config: Option<PathBuf>,
}

impl Default for MapArgs {
    fn default() -> Self {
        Self {
            data_dir: data_dir(),
            output_dir: output_dir(),
            config: None,
        }
    }
}

/// Loads the dataset and renders the map.
///
/// # Errors
///
/// Returns an error if the config is invalid, any city fails to load, or
/// the document cannot be written. Skipped records are not errors; they
/// are listed in the returned report.
pub fn generate_map(args: &MapArgs) -> Result<RenderReport, GenerateError> {
    generate_map_with_progress(args, &null_progress(), &null_progress())
}

/// Same as [`generate_map`], with separate progress sinks for loading and
/// rendering.
///
/// # Errors
///
/// See [`generate_map`].
pub fn generate_map_with_progress(
    args: &MapArgs,
    load_progress: &Arc<dyn ProgressCallback>,
    render_progress: &Arc<dyn ProgressCallback>,
) -> Result<RenderReport, GenerateError> {
    let config = MapConfig::load(args.config.as_deref())?;
    let dataset = load_all_cities_with_progress(&args.data_dir, load_progress)?;
    render_map_with_progress(&dataset, &config, &args.output_dir, render_progress)
}

/// Checks that `selection` names a loaded city (or "All").
///
/// # Errors
///
/// Returns [`GenerateError::UnknownCity`] if no record has that city.
pub fn check_city(
    dataset: &AggregatedDataset,
    selection: Option<&str>,
) -> Result<(), GenerateError> {
    match selection {
        Some(city) if city != school_safety_analytics_models::ALL_CITIES => {
            let cities = dataset.cities();
            if cities.contains(&city) {
                Ok(())
            } else {
                Err(GenerateError::UnknownCity {
                    city: city.to_string(),
                    available: cities.join(", "),
                })
            }
        }
        _ => Ok(()),
    }
}

/// Loads the dataset and writes the JSON export for `city` (or all cities).
///
/// # Errors
///
/// Returns an error if loading fails, the city is unknown, or the file
/// cannot be written.
pub fn export_records(
    data_dir: &Path,
    output_dir: &Path,
    city: Option<&str>,
) -> Result<PathBuf, GenerateError> {
    let dataset = load_all_cities_with_progress(data_dir, &null_progress())?;
    check_city(&dataset, city)?;

    let records = school_safety_analytics::summary::filter_by_city(dataset.records(), city);
    let count = records.len();
    let path = write_export(output_dir, city, records)?;
    log::info!("Exported {count} records to {}", path.display());
    Ok(path)
}

/// Loads the dataset and formats the text summary.
///
/// # Errors
///
/// Returns an error if loading fails or the city is unknown.
pub fn summarize(data_dir: &Path, city: Option<&str>, top: usize) -> Result<String, GenerateError> {
    let dataset = load_all_cities_with_progress(data_dir, &null_progress())?;
    check_city(&dataset, city)?;
    Ok(report::format_report(&dataset, city, top))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn fixture(name: &str) -> (PathBuf, PathBuf) {
        let root = std::env::temp_dir().join(format!("school_safety_generate_lib_{name}"));
        let _ = fs::remove_dir_all(&root);
        let data = root.join("data");
        fs::create_dir_all(&data).unwrap();

        let write = |file: &str, value: serde_json::Value| {
            fs::write(data.join(file), value.to_string()).unwrap();
        };
        write(
            "new delhi_overall.json",
            json!([
                {"school_name": "A", "lat": 28.6, "lon": 77.2, "overall_safety_index": 35.0},
                {"school_name": "B", "lat": 999.0, "lon": 77.2, "overall_safety_index": 12.0}
            ]),
        );
        write(
            "new delhi_pedestrian.json",
            json!([{"pedestrian_safety_index": 20.0}, {"pedestrian_safety_index": null}]),
        );
        write(
            "new delhi_final.json",
            json!([
                {"traffic_light": true, "crosswalk": false},
                {"traffic_light": null, "crosswalk": "yes"}
            ]),
        );

        (data, root.join("generated"))
    }

    #[test]
    fn generates_map_from_data_directory() {
        let (data, out) = fixture("map");
        let report = generate_map(&MapArgs {
            data_dir: data,
            output_dir: out.clone(),
            config: None,
        })
        .unwrap();

        assert_eq!(report.output_path, out.join(OUTPUT_FILE_NAME));
        assert_eq!(report.marker_count, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.extent.is_some());
    }

    #[test]
    fn exports_selected_city() {
        let (data, out) = fixture("export");
        let path = export_records(&data, &out, Some("New delhi")).unwrap();
        assert_eq!(path, out.join("new_delhi_data.json"));

        let text = fs::read_to_string(&path).unwrap();
        let records = school_safety_analytics::export::from_json_records(&text).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn unknown_city_is_rejected() {
        let (data, out) = fixture("unknown_city");
        let err = export_records(&data, &out, Some("Atlantis")).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::UnknownCity { ref available, .. } if available == "New delhi"
        ));
    }

    #[test]
    fn loader_errors_surface_through_generate() {
        let (data, out) = fixture("incomplete");
        fs::remove_file(data.join("new delhi_final.json")).unwrap();
        let err = generate_map(&MapArgs {
            data_dir: data,
            output_dir: out.clone(),
            config: None,
        })
        .unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Load(LoadError::IncompleteCityData { .. })
        ));
        assert!(!out.join(OUTPUT_FILE_NAME).exists());
    }

    #[test]
    fn output_paths_hang_off_workspace_root() {
        assert!(output_dir().starts_with(data_dir()));
        assert!(output_dir().ends_with("data/generated"));
    }
}
