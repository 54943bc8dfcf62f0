#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the school safety dashboard computations.
//!
//! These are plain data: the computations live in `school_safety_analytics`
//! and the drawing lives wherever the numbers are consumed.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Selection value meaning "every city".
pub const ALL_CITIES: &str = "All";

/// Width of each histogram bin, in index points.
pub const HISTOGRAM_BIN_WIDTH: f64 = 5.0;

/// Upper bound of the histogram range. The lower bound is zero.
pub const HISTOGRAM_MAX: f64 = 100.0;

/// Per-city aggregate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySummary {
    /// Canonical city name.
    pub city: String,
    /// Number of schools in the city.
    pub school_count: usize,
    /// Mean overall safety index, rounded to 2 decimals.
    pub mean_overall: Option<f64>,
    /// Mean pedestrian safety index over schools that have one.
    pub mean_pedestrian: Option<f64>,
    /// Mean emergency safety index over schools that have one.
    pub mean_emergency: Option<f64>,
}

/// One fixed-width histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge.
    pub lower: f64,
    /// Upper edge. Exclusive, except for the last bin.
    pub upper: f64,
    /// Values that fell in the bin.
    pub count: u64,
}

/// Boolean infrastructure columns that can be counted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InfrastructureField {
    /// `traffic_light`
    TrafficLight,
    /// `crosswalk`
    Crosswalk,
}

impl InfrastructureField {
    /// Both fields, in dashboard order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::TrafficLight, Self::Crosswalk]
    }

    /// Chart title.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TrafficLight => "Traffic Light",
            Self::Crosswalk => "Crosswalk",
        }
    }
}

/// Tri-state counts for one infrastructure field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceCounts {
    /// Schools where the feature is present.
    pub present: u64,
    /// Schools where the feature is confirmed absent.
    pub absent: u64,
    /// Schools with no value.
    pub unknown: u64,
}

impl PresenceCounts {
    /// Total schools counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.present + self.absent + self.unknown
    }

    /// `(yes, no)` for a two-slice chart; unknown counts as no.
    #[must_use]
    pub const fn chart_counts(&self) -> (u64, u64) {
        (self.present, self.absent + self.unknown)
    }
}

/// Dashboard safety band.
///
/// Bands are right-inclusive intervals and do not coincide with the map's
/// color tiers.
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
pub enum SafetyBand {
    /// (-1, 10]
    Low,
    /// (10, 40]
    Medium,
    /// (40, 100]
    High,
}

impl SafetyBand {
    /// All bands, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }

    /// `(exclusive lower, inclusive upper)` edges.
    #[must_use]
    pub const fn bounds(self) -> (f64, f64) {
        match self {
            Self::Low => (-1.0, 10.0),
            Self::Medium => (10.0, 40.0),
            Self::High => (40.0, 100.0),
        }
    }

    /// Chart label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// The band containing `value`, if any.
    #[must_use]
    pub fn of(value: f64) -> Option<Self> {
        Self::all().iter().copied().find(|band| {
            let (lower, upper) = band.bounds();
            value > lower && value <= upper
        })
    }
}

/// Schools per dashboard band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl BandCounts {
    /// Count for one band.
    #[must_use]
    pub const fn get(&self, band: SafetyBand) -> u64 {
        match band {
            SafetyBand::Low => self.low,
            SafetyBand::Medium => self.medium,
            SafetyBand::High => self.high,
        }
    }

    /// Adds one school to `band`.
    pub const fn increment(&mut self, band: SafetyBand) {
        match band {
            SafetyBand::Low => self.low += 1,
            SafetyBand::Medium => self.medium += 1,
            SafetyBand::High => self.high += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.low + self.medium + self.high
    }
}
