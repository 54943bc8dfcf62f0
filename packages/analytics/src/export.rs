//! JSON record export.
//!
//! Files hold a pretty-printed array of records in the same shape the
//! loader accepts as a records-layout table.

use std::path::{Path, PathBuf};

use school_safety_analytics_models::ALL_CITIES;
use school_safety_school_models::SchoolSafetyRecord;

use crate::AnalyticsError;

/// Download file name for a city selection.
///
/// `None` and `"All"` give `all_cities_data.json`; a city gives its name
/// lower-cased with spaces replaced by underscores.
#[must_use]
pub fn export_file_name(selection: Option<&str>) -> String {
    match selection {
        None => "all_cities_data.json".to_string(),
        Some(city) if city == ALL_CITIES => "all_cities_data.json".to_string(),
        Some(city) => format!("{}_data.json", city.replace(' ', "_").to_lowercase()),
    }
}

/// Serializes records as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`AnalyticsError::Json`] if serialization fails.
pub fn to_json_records<'a, I>(records: I) -> Result<String, AnalyticsError>
where
    I: IntoIterator<Item = &'a SchoolSafetyRecord>,
{
    let records: Vec<&SchoolSafetyRecord> = records.into_iter().collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Parses records written by [`to_json_records`].
///
/// # Errors
///
/// Returns [`AnalyticsError::Json`] if `text` is not a records array.
pub fn from_json_records(text: &str) -> Result<Vec<SchoolSafetyRecord>, AnalyticsError> {
    Ok(serde_json::from_str(text)?)
}

/// Writes the export for `selection` into `dir` and returns its path.
///
/// Writes to a `.tmp` file first, then renames it into place.
///
/// # Errors
///
/// Returns [`AnalyticsError::Io`] if the directory or file cannot be
/// written.
pub fn write_export<'a, I>(
    dir: &Path,
    selection: Option<&str>,
    records: I,
) -> Result<PathBuf, AnalyticsError>
where
    I: IntoIterator<Item = &'a SchoolSafetyRecord>,
{
    let path = dir.join(export_file_name(selection));
    let json = to_json_records(records)?;

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| AnalyticsError::Io { path, source }
    };

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(io_err(&tmp))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path)(e));
    }

    log::info!("Exported records to {}", path.display());
    Ok(path)
}
