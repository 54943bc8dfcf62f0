//! Geospatial renderer: one standalone HTML map from an aggregated dataset.
//!
//! The document carries three layers over a tile basemap:
//!
//! * a clustered circle-marker layer, one marker per school, colored by
//!   safety tier
//! * a heat layer weighted by the overall safety index
//! * a fixed legend listing the tiers
//!
//! Records with unusable coordinates are skipped with an
//! [`InvalidCoordinateWarning`] and never abort the render.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geo::{BoundingRect, MultiPoint, Point, Rect};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use school_safety_school_models::{
    AggregatedDataset, SafetyTier, SchoolSafetyRecord, TierThresholds,
};
use school_safety_source::progress::{ProgressCallback, null_progress};
use serde_json::json;

use crate::config::MapConfig;
use crate::html::{escape_html, escape_script_json};
use crate::template::{MAP_HTML, OVERLAY_SCRIPT, fill};
use crate::{GenerateError, OUTPUT_FILE_NAME};

/// A record left off the map because its position or weight is unusable.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCoordinateWarning {
    pub school_name: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub overall_safety_index: f64,
    /// Which check failed.
    pub reason: String,
}

impl std::fmt::Display for InvalidCoordinateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Skipping '{}' ({}): {} (lat={}, lon={}, overall={})",
            self.school_name, self.city, self.reason, self.lat, self.lon, self.overall_safety_index
        )
    }
}

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    /// Where the document was written.
    pub output_path: PathBuf,
    /// Markers (and heat points) drawn.
    pub marker_count: usize,
    /// Records that were skipped.
    pub warnings: Vec<InvalidCoordinateWarning>,
    /// Bounding rectangle of the drawn points, `None` when nothing was drawn.
    pub extent: Option<Rect<f64>>,
}

/// Map data ready to be embedded.
#[derive(Debug, Clone)]
pub struct MapLayers {
    /// One point feature per drawn school.
    pub markers: FeatureCollection,
    /// `[lat, lon, weight]` per drawn school.
    pub heat: Vec<[f64; 3]>,
    pub extent: Option<Rect<f64>>,
    pub warnings: Vec<InvalidCoordinateWarning>,
}

impl MapLayers {
    /// Number of drawn schools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heat.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heat.is_empty()
    }
}

/// Checks that a record can be placed on the map.
///
/// # Errors
///
/// Returns a warning if latitude is outside `[-90, 90]`, longitude is
/// outside `[-180, 180]`, or any of those or the overall index is not
/// finite.
pub fn validate_record(
    record: &SchoolSafetyRecord,
) -> Result<Point<f64>, InvalidCoordinateWarning> {
    let reason = if !record.lat.is_finite() || !(-90.0..=90.0).contains(&record.lat) {
        Some("latitude outside [-90, 90]")
    } else if !record.lon.is_finite() || !(-180.0..=180.0).contains(&record.lon) {
        Some("longitude outside [-180, 180]")
    } else if !record.overall_safety_index.is_finite() {
        Some("overall safety index is not a finite number")
    } else {
        None
    };

    match reason {
        None => Ok(Point::new(record.lon, record.lat)),
        Some(reason) => Err(InvalidCoordinateWarning {
            school_name: record.school_name.clone(),
            city: record.city.clone(),
            lat: record.lat,
            lon: record.lon,
            overall_safety_index: record.overall_safety_index,
            reason: reason.to_string(),
        }),
    }
}

/// Formats an index the way the popup shows it: `12.0`, `33.5`, or `null`.
fn format_index(value: Option<f64>) -> String {
    value.map_or_else(|| "null".to_string(), |v| format!("{v:?}"))
}

/// Popup body for one school. Every value is HTML-escaped.
#[must_use]
pub fn popup_html(record: &SchoolSafetyRecord) -> String {
    format!(
        "<b>{}</b><br>City: {}<br>Safety Index: {}<br>Pedestrian: {}<br>Emergency: {}",
        escape_html(&record.school_name),
        escape_html(&record.city),
        format_index(Some(record.overall_safety_index)),
        format_index(record.pedestrian_safety_index),
        format_index(record.emergency_safety_index),
    )
}

fn marker_feature(
    record: &SchoolSafetyRecord,
    point: Point<f64>,
    tier: SafetyTier,
    config: &MapConfig,
) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("school_name".to_string(), json!(record.school_name));
    properties.insert("city".to_string(), json!(record.city));
    properties.insert("tier".to_string(), json!(tier));
    properties.insert("color".to_string(), json!(config.tiers.color(tier)));
    properties.insert("popup".to_string(), json!(popup_html(record)));
    properties.insert("tooltip".to_string(), json!(escape_html(&record.school_name)));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&point))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Validates, classifies and converts every record into map layers.
#[must_use]
pub fn build_layers(
    dataset: &AggregatedDataset,
    config: &MapConfig,
    thresholds: &TierThresholds,
) -> MapLayers {
    let mut features = Vec::with_capacity(dataset.len());
    let mut heat = Vec::with_capacity(dataset.len());
    let mut points = Vec::with_capacity(dataset.len());
    let mut warnings = Vec::new();

    for record in dataset {
        match validate_record(record) {
            Ok(point) => {
                let tier = thresholds.classify(record.overall_safety_index);
                features.push(marker_feature(record, point, tier, config));
                heat.push([record.lat, record.lon, record.overall_safety_index]);
                points.push(point);
            }
            Err(warning) => {
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }
    }

    MapLayers {
        markers: FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
        heat,
        extent: MultiPoint::new(points).bounding_rect(),
        warnings,
    }
}

/// Legend overlay listing each tier with its color and boundaries.
#[must_use]
pub fn legend_html(config: &MapConfig, thresholds: &TierThresholds) -> String {
    let medium = format_bound(thresholds.medium_min);
    let high = format_bound(thresholds.high_min);

    let mut html = String::from("  <div class=\"legend\">\n");
    let _ = writeln!(html, "    <b>{}</b><br>", escape_html(&config.legend.title));
    for tier in SafetyTier::all_descending() {
        let range = match tier {
            SafetyTier::High => format!("{high}+"),
            SafetyTier::Medium => format!("{medium}\u{2013}{high}"),
            SafetyTier::Low => format!("&lt; {medium}"),
        };
        let _ = writeln!(
            html,
            "    <span class=\"swatch\" style=\"background: {};\"></span> {} ({range})<br>",
            escape_html(config.tiers.color(*tier)),
            tier.label(),
        );
    }
    html.push_str("  </div>");
    html
}

/// `30.0` → `30`, `12.5` → `12.5`.
fn format_bound(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn settings_json(config: &MapConfig) -> serde_json::Value {
    json!({
        "center": config.view.center,
        "zoom": config.view.zoom,
        "controlScale": config.view.control_scale,
        "tiles": {
            "name": config.tiles.name,
            "url": config.tiles.url,
            "attribution": config.tiles.attribution,
            "maxZoom": config.tiles.max_zoom,
        },
        "markers": {
            "radius": config.markers.radius,
            "weight": config.markers.weight,
            "fillOpacity": config.markers.fill_opacity,
        },
        "heatmap": {
            "minOpacity": config.heatmap.min_opacity,
            "radius": config.heatmap.radius,
            "blur": config.heatmap.blur,
            "maxZoom": config.heatmap.max_zoom,
        },
    })
}

/// Renders the complete HTML document.
///
/// With no drawable points the document holds only the basemap and the
/// legend.
///
/// # Errors
///
/// Returns [`GenerateError::Json`] if the layer data cannot be serialized.
pub fn render_html(
    layers: &MapLayers,
    config: &MapConfig,
    thresholds: &TierThresholds,
    generated_at: chrono::DateTime<chrono::Utc>,
) -> Result<String, GenerateError> {
    let settings = escape_script_json(&serde_json::to_string(&settings_json(config))?);

    let overlay = if layers.is_empty() {
        String::new()
    } else {
        let markers = escape_script_json(&serde_json::to_string(&layers.markers)?);
        let heat = escape_script_json(&serde_json::to_string(&layers.heat)?);
        fill(
            OVERLAY_SCRIPT,
            &[("MARKERS_JSON", &markers), ("HEAT_JSON", &heat)],
        )
    };

    let comment = format!(
        "Generated by school_safety_generate at {}; {} schools, {} skipped",
        generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        layers.len(),
        layers.warnings.len(),
    );

    Ok(fill(
        MAP_HTML,
        &[
            ("GENERATED_COMMENT", &comment),
            ("TITLE", &escape_html(&config.title)),
            ("LEAFLET_CSS", &escape_html(&config.assets.leaflet_css)),
            ("MARKERCLUSTER_CSS", &escape_html(&config.assets.markercluster_css)),
            (
                "MARKERCLUSTER_DEFAULT_CSS",
                &escape_html(&config.assets.markercluster_default_css),
            ),
            ("LEAFLET_JS", &escape_html(&config.assets.leaflet_js)),
            ("MARKERCLUSTER_JS", &escape_html(&config.assets.markercluster_js)),
            ("HEAT_JS", &escape_html(&config.assets.heat_js)),
            ("LEGEND_HTML", &legend_html(config, thresholds)),
            ("SETTINGS_JSON", &settings),
            ("OVERLAY_SCRIPT", &overlay),
        ],
    ))
}

/// Writes `contents` to `dir/name` through a `.tmp` sibling and a rename.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] if the directory or file cannot be written.
pub fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, GenerateError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| GenerateError::Io { path, source }
    };

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(name);
    let tmp_path = dir.join(format!("{name}.tmp"));
    std::fs::write(&tmp_path, contents).map_err(io_err(&tmp_path))?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path)(e));
    }
    Ok(path)
}

/// Renders `dataset` and writes `all_cities_safety_map.html` into
/// `output_dir`.
///
/// # Errors
///
/// Returns [`GenerateError::Config`] for invalid tier thresholds, or an
/// I/O or JSON error from writing the document.
pub fn render_map(
    dataset: &AggregatedDataset,
    config: &MapConfig,
    output_dir: &Path,
) -> Result<RenderReport, GenerateError> {
    render_map_with_progress(dataset, config, output_dir, &null_progress())
}

/// Same as [`render_map`], reporting each stage to `progress`.
///
/// # Errors
///
/// See [`render_map`].
pub fn render_map_with_progress(
    dataset: &AggregatedDataset,
    config: &MapConfig,
    output_dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RenderReport, GenerateError> {
    let thresholds = config
        .tiers
        .thresholds()
        .map_err(crate::config::ConfigError::from)?;

    progress.set_total(2);
    progress.set_message(format!("Building layers for {} schools", dataset.len()));
    let layers = build_layers(dataset, config, &thresholds);
    progress.inc(1);

    progress.set_message("Writing map document".to_string());
    let html = render_html(&layers, config, &thresholds, chrono::Utc::now())?;
    let output_path = write_atomic(output_dir, OUTPUT_FILE_NAME, &html)?;
    progress.inc(1);

    let report = RenderReport {
        output_path,
        marker_count: layers.len(),
        warnings: layers.warnings,
        extent: layers.extent,
    };

    progress.finish(format!(
        "Map written with {} markers ({} skipped)",
        report.marker_count,
        report.warnings.len()
    ));
    log::info!(
        "Map generated: {} ({} markers, {} skipped)",
        report.output_path.display(),
        report.marker_count,
        report.warnings.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use school_safety_school_models::Presence;

    use super::*;

    fn record(name: &str, lat: f64, lon: f64, overall: f64) -> SchoolSafetyRecord {
        SchoolSafetyRecord {
            school_name: name.to_string(),
            city: "Delhi".to_string(),
            lat,
            lon,
            overall_safety_index: overall,
            pedestrian_safety_index: Some(20.5),
            emergency_safety_index: None,
            traffic_light: Presence::Present,
            crosswalk: Presence::Unknown,
            extra: BTreeMap::new(),
        }
    }

    fn config() -> MapConfig {
        MapConfig::embedded().unwrap()
    }

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("school_safety_generate_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn rejects_out_of_range_and_non_finite_positions() {
        assert!(validate_record(&record("ok", 28.6, 77.2, 12.0)).is_ok());
        assert!(validate_record(&record("edge", 90.0, -180.0, 0.0)).is_ok());

        let warning = validate_record(&record("far", 999.0, 77.2, 12.0)).unwrap_err();
        assert_eq!(warning.school_name, "far");
        assert!(warning.reason.contains("latitude"));

        assert!(validate_record(&record("lon", 28.6, 180.5, 12.0)).is_err());
        assert!(validate_record(&record("nan", f64::NAN, 77.2, 12.0)).is_err());
        assert!(validate_record(&record("inf", 28.6, 77.2, f64::INFINITY)).is_err());
    }

    #[test]
    fn invalid_record_is_skipped_and_others_render() {
        let dataset = AggregatedDataset::new(vec![
            record("A", 28.6, 77.2, 35.0),
            record("Bad", 999.0, 77.2, 12.0),
            record("C", 19.0, 72.8, 5.0),
        ]);
        let config = config();
        let layers = build_layers(&dataset, &config, &TierThresholds::default());

        assert_eq!(layers.len(), 2);
        assert_eq!(layers.markers.features.len(), 2);
        assert_eq!(layers.warnings.len(), 1);
        assert_eq!(layers.warnings[0].school_name, "Bad");
        assert!(layers.heat.iter().all(|[lat, _, _]| *lat < 90.0));
        assert_eq!(layers.heat[0], [28.6, 77.2, 35.0]);

        let extent = layers.extent.unwrap();
        assert!((extent.min().x - 72.8).abs() < f64::EPSILON);
        assert!((extent.max().y - 28.6).abs() < f64::EPSILON);
    }

    #[test]
    fn markers_carry_tier_colors() {
        let dataset = AggregatedDataset::new(vec![
            record("high", 28.6, 77.2, 30.0),
            record("medium", 28.6, 77.2, 10.0),
            record("low", 28.6, 77.2, 9.99),
        ]);
        let layers = build_layers(&dataset, &config(), &TierThresholds::default());
        let colors: Vec<&serde_json::Value> = layers
            .markers
            .features
            .iter()
            .map(|f| &f.properties.as_ref().unwrap()["color"])
            .collect();
        assert_eq!(colors, vec!["green", "orange", "red"]);
    }

    #[test]
    fn popup_escapes_names_and_shows_null() {
        let popup = popup_html(&record("<script>x</script> & Co", 1.0, 1.0, 30.0));
        assert!(popup.starts_with("<b>&lt;script&gt;x&lt;/script&gt; &amp; Co</b>"));
        assert!(popup.contains("Safety Index: 30.0"));
        assert!(popup.contains("Pedestrian: 20.5"));
        assert!(popup.contains("Emergency: null"));
    }

    #[test]
    fn empty_dataset_renders_basemap_and_legend_only() {
        let config = config();
        let layers = build_layers(
            &AggregatedDataset::default(),
            &config,
            &TierThresholds::default(),
        );
        assert!(layers.extent.is_none());

        let html =
            render_html(&layers, &config, &TierThresholds::default(), chrono::Utc::now()).unwrap();
        assert!(html.contains("L.tileLayer("));
        assert!(html.contains("Safety Index Legend"));
        assert!(html.contains("No basemap"));
        assert!(!html.contains("L.markerClusterGroup("));
        assert!(!html.contains("L.heatLayer("));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn embedded_data_cannot_break_out_of_script() {
        let dataset = AggregatedDataset::new(vec![record("</script><b>x", 28.6, 77.2, 12.0)]);
        let config = config();
        let layers = build_layers(&dataset, &config, &TierThresholds::default());
        let html =
            render_html(&layers, &config, &TierThresholds::default(), chrono::Utc::now()).unwrap();

        assert_eq!(html.matches("</script>").count(), MAP_HTML.matches("</script>").count());
        assert!(html.contains("L.markerClusterGroup("));
        assert!(html.contains("L.heatLayer("));
    }

    #[test]
    fn legend_lists_tiers_with_bounds() {
        let legend = legend_html(&config(), &TierThresholds::default());
        let high = legend.find("High (30+)").unwrap();
        let medium = legend.find("Medium (10\u{2013}30)").unwrap();
        let low = legend.find("Low (&lt; 10)").unwrap();
        assert!(high < medium && medium < low);
        assert!(legend.contains("background: green;"));
    }

    #[test]
    fn render_writes_document_atomically() {
        let dir = fixture_dir("render");
        let dataset = AggregatedDataset::new(vec![
            record("A", 28.6, 77.2, 35.0),
            record("Bad", 999.0, 77.2, 12.0),
        ]);

        let report = render_map(&dataset, &config(), &dir).unwrap();
        assert_eq!(report.output_path, dir.join("all_cities_safety_map.html"));
        assert_eq!(report.marker_count, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(!dir.join("all_cities_safety_map.html.tmp").exists());

        let html = std::fs::read_to_string(&report.output_path).unwrap();
        assert!(html.contains("Generated by school_safety_generate"));
        assert!(html.contains("1 schools, 1 skipped"));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = fixture_dir("rename_blocked");
        let blocker = dir.join("all_cities_safety_map.html");
        std::fs::create_dir_all(blocker.join("occupied")).unwrap();

        let err = write_atomic(&dir, "all_cities_safety_map.html", "<html></html>").unwrap_err();
        assert!(matches!(err, GenerateError::Io { ref path, .. } if *path == blocker));
        assert!(!dir.join("all_cities_safety_map.html.tmp").exists());
    }

    #[test]
    fn invalid_thresholds_fail_before_writing() {
        let dir = fixture_dir("bad_thresholds");
        let mut config = config();
        config.tiers.medium_min = 50.0;

        let err = render_map(&AggregatedDataset::default(), &config, &dir).unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)));
        assert!(!dir.join("all_cities_safety_map.html").exists());
    }
}
