//! Source file discovery and per-city grouping.
//!
//! Scans a flat data directory, classifies each `.json` file by its city
//! prefix and category keyword, and groups the files into one
//! [`CitySourceBundle`] per city. The grouping lives only for the duration
//! of a single load call.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use school_safety_source_models::{
    CITY_SEPARATOR, DATA_FILE_EXTENSION, SourceCategory, SourceFile,
};

use crate::LoadError;
use crate::parsing::canonicalize_city;

/// The category files found for one city.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitySourceBundle {
    files: BTreeMap<SourceCategory, PathBuf>,
}

impl CitySourceBundle {
    /// Adds a file to the bundle.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::DuplicateSource`] if the bundle already holds a
    /// file for the same category.
    pub fn insert(&mut self, file: SourceFile) -> Result<(), LoadError> {
        match self.files.entry(file.category) {
            Entry::Vacant(slot) => {
                slot.insert(file.path);
                Ok(())
            }
            Entry::Occupied(existing) => Err(LoadError::DuplicateSource {
                city: canonicalize_city(&file.city_key),
                category: file.category,
                first: existing.get().clone(),
                second: file.path,
            }),
        }
    }

    /// Returns the file for `category`, if present.
    #[must_use]
    pub fn get(&self, category: SourceCategory) -> Option<&Path> {
        self.files.get(&category).map(PathBuf::as_path)
    }

    /// Returns the first category (in precedence order) with no file.
    #[must_use]
    pub fn missing(&self) -> Option<SourceCategory> {
        SourceCategory::all()
            .iter()
            .copied()
            .find(|c| !self.files.contains_key(c))
    }
}

/// Extracts the city key from a source file name.
///
/// The key is everything before the first `_`. A name without a separator
/// uses its stem (`delhi.json` → `delhi`).
#[must_use]
pub fn city_key(file_name: &str) -> &str {
    match file_name.split_once(CITY_SEPARATOR) {
        Some((prefix, _)) => prefix,
        None => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name),
    }
}

/// Classifies a single path, returning `None` for files the loader ignores.
#[must_use]
pub fn classify(path: &Path) -> Option<SourceFile> {
    if path.extension().and_then(|e| e.to_str()) != Some(DATA_FILE_EXTENSION) {
        return None;
    }

    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        log::warn!("Skipping non-UTF-8 file name: {}", path.display());
        return None;
    };

    let Some(category) = SourceCategory::from_file_name(file_name) else {
        log::warn!("Skipping {file_name}: no overall/pedestrian/final keyword in name");
        return None;
    };

    let key = city_key(file_name);
    if key.is_empty() {
        log::warn!("Skipping {file_name}: empty city prefix");
        return None;
    }

    Some(SourceFile {
        city_key: key.to_string(),
        category,
        path: path.to_path_buf(),
    })
}

/// Lists and classifies the source files in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`LoadError::SourceDirectoryNotFound`] if `dir` is not a
/// directory, or [`LoadError::Io`] if it cannot be listed.
pub fn discover_sources(dir: &Path) -> Result<Vec<SourceFile>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::SourceDirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let files: Vec<SourceFile> = paths.iter().filter_map(|p| classify(p)).collect();
    log::debug!(
        "Classified {} of {} files in {}",
        files.len(),
        paths.len(),
        dir.display()
    );
    Ok(files)
}

/// Groups classified files by canonical city name.
///
/// Keys that differ only in the case of their first letter (`delhi`,
/// `Delhi`) land in the same bundle.
///
/// # Errors
///
/// Returns [`LoadError::DuplicateSource`] if two files claim the same city
/// and category.
pub fn group_by_city(
    files: Vec<SourceFile>,
) -> Result<BTreeMap<String, CitySourceBundle>, LoadError> {
    let mut bundles: BTreeMap<String, CitySourceBundle> = BTreeMap::new();
    for file in files {
        bundles
            .entry(canonicalize_city(&file.city_key))
            .or_default()
            .insert(file)?;
    }
    Ok(bundles)
}
