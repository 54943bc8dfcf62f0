#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! School safety record types and tier definitions.
//!
//! This crate defines the canonical per-school record produced by the
//! dataset loader and read by every downstream consumer (map renderer,
//! analytics, JSON export). The [`AggregatedDataset`] is built once per
//! invocation and is read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Map color tier for a safety index.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyTier {
    /// Below the medium boundary
    Low,
    /// At or above the medium boundary, below the high boundary
    Medium,
    /// At or above the high boundary
    High,
}

impl SafetyTier {
    /// Returns the human-readable label used in legends.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Returns all tiers from highest to lowest, the order legends list them.
    #[must_use]
    pub const fn all_descending() -> &'static [Self] {
        &[Self::High, Self::Medium, Self::Low]
    }
}

/// Numeric boundaries splitting safety indices into [`SafetyTier`]s.
///
/// `score >= high_min` is [`SafetyTier::High`], `medium_min <= score <
/// high_min` is [`SafetyTier::Medium`], and everything below is
/// [`SafetyTier::Low`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Lowest score classified as medium.
    pub medium_min: f64,
    /// Lowest score classified as high.
    pub high_min: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            medium_min: 10.0,
            high_min: 30.0,
        }
    }
}

impl TierThresholds {
    /// Creates thresholds, validating that both are finite and ordered.
    ///
    /// # Errors
    ///
    /// Returns an error if either boundary is non-finite or if
    /// `medium_min >= high_min`.
    pub fn new(medium_min: f64, high_min: f64) -> Result<Self, InvalidThresholdsError> {
        let thresholds = Self {
            medium_min,
            high_min,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Checks that both boundaries are finite and `medium_min < high_min`.
    ///
    /// # Errors
    ///
    /// Returns an error describing the offending boundaries.
    pub fn validate(&self) -> Result<(), InvalidThresholdsError> {
        if self.medium_min.is_finite()
            && self.high_min.is_finite()
            && self.medium_min < self.high_min
        {
            Ok(())
        } else {
            Err(InvalidThresholdsError {
                medium_min: self.medium_min,
                high_min: self.high_min,
            })
        }
    }

    /// Classifies a safety index into its tier.
    ///
    /// NaN compares false against both boundaries and lands in
    /// [`SafetyTier::Low`]; callers that render scores filter non-finite
    /// values first.
    #[must_use]
    pub fn classify(&self, score: f64) -> SafetyTier {
        if score >= self.high_min {
            SafetyTier::High
        } else if score >= self.medium_min {
            SafetyTier::Medium
        } else {
            SafetyTier::Low
        }
    }
}

/// Error returned when tier boundaries are non-finite or out of order.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error(
    "invalid tier thresholds: medium_min {medium_min} must be finite and below high_min {high_min}"
)]
pub struct InvalidThresholdsError {
    /// The rejected medium boundary.
    pub medium_min: f64,
    /// The rejected high boundary.
    pub high_min: f64,
}

/// Tri-state infrastructure flag (traffic light, crosswalk).
///
/// Source files either confirm the feature, deny it, or say nothing. The
/// distinction between [`Presence::Absent`] and [`Presence::Unknown`] is kept
/// all the way to export; on the wire it is `true` / `false` / `null`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(from = "Option<bool>", into = "Option<bool>")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    /// The feature is confirmed present.
    Present,
    /// The feature is confirmed absent.
    Absent,
    /// The source had no value for this school.
    #[default]
    Unknown,
}

impl Presence {
    /// Collapses the tri-state into a boolean, treating unknown as absent.
    #[must_use]
    pub const fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_option(self) -> Option<bool> {
        match self {
            Self::Present => Some(true),
            Self::Absent => Some(false),
            Self::Unknown => None,
        }
    }
}

impl From<Option<bool>> for Presence {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Present,
            Some(false) => Self::Absent,
            None => Self::Unknown,
        }
    }
}

impl From<Presence> for Option<bool> {
    fn from(value: Presence) -> Self {
        value.as_option()
    }
}

/// One school with its merged safety indicators.
///
/// Field names match the source columns so the JSON export reads like the
/// per-city source files it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolSafetyRecord {
    /// School name (not guaranteed unique, even within a city).
    pub school_name: String,
    /// Canonicalized city name (first letter upper-cased).
    pub city: String,
    /// Latitude (WGS84). Range is checked at render time, not load time.
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
    /// Overall safety index, expected 0-100.
    pub overall_safety_index: f64,
    /// Pedestrian safety index, expected 0-100.
    #[serde(default)]
    pub pedestrian_safety_index: Option<f64>,
    /// Emergency safety index. Only some sources provide it.
    #[serde(default)]
    pub emergency_safety_index: Option<f64>,
    /// Whether a traffic light is present near the school.
    #[serde(default)]
    pub traffic_light: Presence,
    /// Whether a crosswalk is present near the school.
    #[serde(default)]
    pub crosswalk: Presence,
    /// Any other columns of the overall source table, carried unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Column names with a dedicated field on [`SchoolSafetyRecord`].
pub const RECORD_COLUMNS: &[&str] = &[
    "school_name",
    "city",
    "lat",
    "lon",
    "overall_safety_index",
    "pedestrian_safety_index",
    "emergency_safety_index",
    "traffic_light",
    "crosswalk",
];

/// All merged records across all cities.
///
/// Ordered by city key, then by source row order within each city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedDataset {
    records: Vec<SchoolSafetyRecord>,
}

impl AggregatedDataset {
    /// Wraps an already-ordered list of merged records.
    #[must_use]
    pub const fn new(records: Vec<SchoolSafetyRecord>) -> Self {
        Self { records }
    }

    /// Returns the records in dataset order.
    #[must_use]
    pub fn records(&self) -> &[SchoolSafetyRecord] {
        &self.records
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, SchoolSafetyRecord> {
        self.records.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct city names, sorted.
    #[must_use]
    pub fn cities(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.city.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<'a> IntoIterator for &'a AggregatedDataset {
    type Item = &'a SchoolSafetyRecord;
    type IntoIter = std::slice::Iter<'a, SchoolSafetyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, city: &str, overall: f64) -> SchoolSafetyRecord {
        SchoolSafetyRecord {
            school_name: name.to_string(),
            city: city.to_string(),
            lat: 28.6,
            lon: 77.2,
            overall_safety_index: overall,
            pedestrian_safety_index: None,
            emergency_safety_index: None,
            traffic_light: Presence::Unknown,
            crosswalk: Presence::Unknown,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn classifies_tier_boundaries() {
        let t = TierThresholds::default();
        assert_eq!(t.classify(0.0), SafetyTier::Low);
        assert_eq!(t.classify(9.999), SafetyTier::Low);
        assert_eq!(t.classify(10.0), SafetyTier::Medium);
        assert_eq!(t.classify(29.999), SafetyTier::Medium);
        assert_eq!(t.classify(30.0), SafetyTier::High);
        assert_eq!(t.classify(100.0), SafetyTier::High);
        assert_eq!(t.classify(-5.0), SafetyTier::Low);
    }

    #[test]
    fn tiers_partition_the_score_range() {
        let t = TierThresholds::default();
        for step in 0..=1000 {
            let score = f64::from(step) / 10.0;
            let tier = t.classify(score);
            let expected = if score >= 30.0 {
                SafetyTier::High
            } else if score >= 10.0 {
                SafetyTier::Medium
            } else {
                SafetyTier::Low
            };
            assert_eq!(tier, expected, "score {score}");
        }
    }

    #[test]
    fn rejects_unordered_thresholds() {
        assert!(TierThresholds::new(30.0, 10.0).is_err());
        assert!(TierThresholds::new(10.0, 10.0).is_err());
        assert!(TierThresholds::new(f64::NAN, 10.0).is_err());
        assert!(TierThresholds::new(5.0, 50.0).is_ok());
    }

    #[test]
    fn threshold_error_names_both_boundaries() {
        let err = TierThresholds::new(30.0, 10.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid tier thresholds: medium_min 30 must be finite and below high_min 10"
        );
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn presence_wire_format() {
        assert_eq!(serde_json::to_string(&Presence::Present).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Presence::Absent).unwrap(), "false");
        assert_eq!(serde_json::to_string(&Presence::Unknown).unwrap(), "null");
        let parsed: Presence = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, Presence::Unknown);
        assert!(!Presence::Unknown.is_present());
        assert!(Presence::Present.is_present());
    }

    #[test]
    fn record_missing_optional_fields_deserializes() {
        let json = r#"{
            "school_name": "Govt School",
            "city": "Delhi",
            "lat": 28.6,
            "lon": 77.2,
            "overall_safety_index": 42.0,
            "ward": "North"
        }"#;
        let rec: SchoolSafetyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.traffic_light, Presence::Unknown);
        assert_eq!(rec.pedestrian_safety_index, None);
        assert_eq!(rec.extra.get("ward"), Some(&serde_json::json!("North")));
    }

    #[test]
    fn dataset_lists_distinct_sorted_cities() {
        let ds = AggregatedDataset::new(vec![
            record("a", "Mumbai", 1.0),
            record("b", "Delhi", 2.0),
            record("c", "Mumbai", 3.0),
        ]);
        assert_eq!(ds.cities(), vec!["Delhi", "Mumbai"]);
        assert_eq!(ds.len(), 3);
        assert!(!ds.is_empty());
    }
}
