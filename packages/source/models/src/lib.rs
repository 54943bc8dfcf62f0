#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Source file categories and descriptors.
//!
//! Every city contributes three source tables, one per [`SourceCategory`].
//! A file's city and category are both encoded in its name, e.g.
//! `delhi_overall_safety.json` or `mumbai_final_infra.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Extension (without the dot) of files the loader considers.
pub const DATA_FILE_EXTENSION: &str = "json";

/// Separator between the city prefix and the rest of a source file name.
pub const CITY_SEPARATOR: char = '_';

/// The safety dimension a source table covers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceCategory {
    /// Base table: school names, coordinates, overall index.
    Overall,
    /// Pedestrian safety index.
    Pedestrian,
    /// Infrastructure flags (traffic light, crosswalk).
    Final,
}

impl SourceCategory {
    /// Returns all categories in keyword-matching precedence order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Overall, Self::Pedestrian, Self::Final]
    }

    /// Returns the keyword that marks a file as belonging to this category.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Pedestrian => "pedestrian",
            Self::Final => "final",
        }
    }

    /// Finds the category whose keyword appears in `file_name`.
    ///
    /// Matching is case-sensitive. When several keywords appear, the first
    /// in [`SourceCategory::all`] order wins.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| file_name.contains(c.keyword()))
    }
}

/// A classified source file discovered in the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Raw city key: the file name prefix before the first `_`.
    pub city_key: String,
    /// Which table this file provides.
    pub category: SourceCategory,
    /// Full path to the file.
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_keyword_anywhere_in_name() {
        assert_eq!(
            SourceCategory::from_file_name("delhi_overall.json"),
            Some(SourceCategory::Overall)
        );
        assert_eq!(
            SourceCategory::from_file_name("delhi_school_pedestrian_index.json"),
            Some(SourceCategory::Pedestrian)
        );
        assert_eq!(
            SourceCategory::from_file_name("delhi_final.json"),
            Some(SourceCategory::Final)
        );
        assert_eq!(SourceCategory::from_file_name("delhi_notes.json"), None);
    }

    #[test]
    fn overall_takes_precedence() {
        assert_eq!(
            SourceCategory::from_file_name("delhi_pedestrian_overall.json"),
            Some(SourceCategory::Overall)
        );
        assert_eq!(
            SourceCategory::from_file_name("delhi_final_pedestrian.json"),
            Some(SourceCategory::Pedestrian)
        );
    }

    #[test]
    fn keyword_match_is_case_sensitive() {
        assert_eq!(SourceCategory::from_file_name("delhi_OVERALL.json"), None);
    }

    #[test]
    fn displays_as_keyword() {
        for category in SourceCategory::all() {
            assert_eq!(category.to_string(), category.keyword());
        }
    }
}
