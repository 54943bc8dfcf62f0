//! Map rendering configuration.
//!
//! The defaults live in `config/map.toml` and are embedded into the binary
//! at compile time via [`include_str!`]. A user file is merged over them
//! table by table, so an override file only needs the keys it changes:
//!
//! ```toml
//! [view]
//! center = [19.07, 72.87]
//! zoom = 10
//! ```

use std::path::Path;

use school_safety_school_models::{InvalidThresholdsError, SafetyTier, TierThresholds};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{Table, Value};

/// The embedded default configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/map.toml");

/// Errors raised while building a [`MapConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A TOML document could not be parsed or did not match the schema.
    #[error("Failed to parse {origin}: {source}")]
    Parse {
        /// Where the document came from.
        origin: String,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// The merged table could not be written back out for re-parsing.
    #[error("Failed to serialize merged config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The override file could not be read.
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// Override file path.
        path: std::path::PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// `medium_min` is not strictly below `high_min`.
    #[error("Invalid tier thresholds: {0}")]
    InvalidTierThresholds(#[from] InvalidThresholdsError),
}

/// Everything the renderer needs besides the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Document title.
    pub title: String,
    pub view: ViewConfig,
    pub tiles: TileConfig,
    pub markers: MarkerStyle,
    pub tiers: TierConfig,
    pub heatmap: HeatmapConfig,
    pub legend: LegendConfig,
    pub assets: AssetUrls,
}

/// Initial viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// `[lat, lon]` of the initial center.
    pub center: [f64; 2],
    /// Initial zoom level.
    pub zoom: u8,
    /// Whether to show a scale control.
    pub control_scale: bool,
}

/// Basemap tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileConfig {
    /// Name shown in the layer control.
    pub name: String,
    /// Leaflet URL template.
    pub url: String,
    /// Attribution HTML.
    pub attribution: String,
    pub max_zoom: u8,
}

/// Circle marker style shared by every school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub radius: f64,
    pub weight: f64,
    pub fill_opacity: f64,
}

/// Tier boundaries and colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Lowest index classified as [`SafetyTier::Medium`].
    pub medium_min: f64,
    /// Lowest index classified as [`SafetyTier::High`].
    pub high_min: f64,
    pub colors: TierColors,
}

impl TierConfig {
    /// Validated thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidThresholdsError`] unless `medium_min < high_min`.
    pub fn thresholds(&self) -> Result<TierThresholds, InvalidThresholdsError> {
        TierThresholds::new(self.medium_min, self.high_min)
    }

    /// CSS color for a tier.
    #[must_use]
    pub fn color(&self, tier: SafetyTier) -> &str {
        match tier {
            SafetyTier::Low => &self.colors.low,
            SafetyTier::Medium => &self.colors.medium,
            SafetyTier::High => &self.colors.high,
        }
    }
}

/// CSS colors per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierColors {
    pub low: String,
    pub medium: String,
    pub high: String,
}

/// Density layer options, passed through to `leaflet.heat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    pub min_opacity: f64,
    pub radius: f64,
    pub blur: f64,
    pub max_zoom: u8,
}

/// Legend overlay text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendConfig {
    pub title: String,
}

/// CDN URLs for the map libraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUrls {
    pub leaflet_css: String,
    pub leaflet_js: String,
    pub markercluster_css: String,
    pub markercluster_default_css: String,
    pub markercluster_js: String,
    pub heat_js: String,
}

impl MapConfig {
    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(DEFAULT_CONFIG_TOML).map_err(|source| {
            ConfigError::Parse {
                origin: "embedded map.toml".to_string(),
                source,
            }
        })?;
        config.tiers.thresholds()?;
        Ok(config)
    }

    /// Merges `text` over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if either document is malformed or the
    /// merged result does not match the schema, and
    /// [`ConfigError::InvalidTierThresholds`] if the tiers overlap.
    pub fn from_override_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let parse = |text: &str, origin: &str| {
            toml::from_str::<Table>(text).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })
        };

        let mut merged = parse(DEFAULT_CONFIG_TOML, "embedded map.toml")?;
        merge_tables(&mut merged, parse(text, origin)?);

        let rendered = toml::to_string(&merged)?;
        let config: Self = toml::from_str(&rendered).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.tiers.thresholds()?;
        Ok(config)
    }

    /// Loads the defaults, merged with the file at `path` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any error
    /// from [`Self::from_override_str`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::embedded();
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Using map config override {}", path.display());
        Self::from_override_str(&text, &path.display().to_string())
    }
}

/// Recursively merges `overlay` into `base`. Nested tables merge key by
/// key; any other value replaces what was there.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
