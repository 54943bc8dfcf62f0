//! HTML shell for the generated map.
//!
//! Placeholders are written as `{{NAME}}` and filled in one pass by
//! [`fill`], so substituted text is never scanned for further
//! placeholders.

/// The standalone map document.
pub const MAP_HTML: &str = r#"<!doctype html>
<html lang="en">

<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <!-- {{GENERATED_COMMENT}} -->
  <title>{{TITLE}}</title>

  <!-- Leaflet, clustering and heat plugins -->
  <link rel="stylesheet" href="{{LEAFLET_CSS}}" />
  <link rel="stylesheet" href="{{MARKERCLUSTER_CSS}}" />
  <link rel="stylesheet" href="{{MARKERCLUSTER_DEFAULT_CSS}}" />
  <script src="{{LEAFLET_JS}}"></script>
  <script src="{{MARKERCLUSTER_JS}}"></script>
  <script src="{{HEAT_JS}}"></script>

  <style>
    html, body { height: 100%; margin: 0; }
    #map { position: absolute; inset: 0; }
    .legend {
      position: fixed;
      bottom: 30px; left: 30px; width: 180px;
      z-index: 1000;
      background-color: white;
      border-radius: 8px;
      padding: 12px;
      box-shadow: 0 0 10px rgba(0,0,0,0.3);
      font-family: sans-serif;
      font-size: 14px;
    }
    .legend .swatch {
      width: 12px; height: 12px;
      display: inline-block;
      margin-right: 4px;
    }
  </style>
</head>

<body>
  <div id="map"></div>
{{LEGEND_HTML}}
  <script>
    const settings = {{SETTINGS_JSON}};

    const map = L.map("map", { center: settings.center, zoom: settings.zoom });
    if (settings.controlScale) {
      L.control.scale().addTo(map);
    }

    const baseLayers = {};
    baseLayers[settings.tiles.name] = L.tileLayer(settings.tiles.url, {
      attribution: settings.tiles.attribution,
      maxZoom: settings.tiles.maxZoom,
    }).addTo(map);
    baseLayers["No basemap"] = L.layerGroup();

    const overlays = {};
{{OVERLAY_SCRIPT}}
    L.control.layers(baseLayers, overlays, { collapsed: false }).addTo(map);
  </script>
</body>

</html>
"#;

/// Cluster and heat layers. Only emitted when there is at least one point.
pub const OVERLAY_SCRIPT: &str = r#"
    const schools = {{MARKERS_JSON}};
    const cluster = L.markerClusterGroup();
    L.geoJSON(schools, {
      pointToLayer: (feature, latlng) => L.circleMarker(latlng, {
        radius: settings.markers.radius,
        weight: settings.markers.weight,
        color: feature.properties.color,
        fill: true,
        fillColor: feature.properties.color,
        fillOpacity: settings.markers.fillOpacity,
      }),
      onEachFeature: (feature, layer) => {
        layer.bindPopup(feature.properties.popup);
        layer.bindTooltip(feature.properties.tooltip);
      },
    }).addTo(cluster);
    cluster.addTo(map);
    overlays["Schools"] = cluster;

    const heat = L.heatLayer({{HEAT_JSON}}, {
      minOpacity: settings.heatmap.minOpacity,
      radius: settings.heatmap.radius,
      blur: settings.heatmap.blur,
      maxZoom: settings.heatmap.maxZoom,
    }).addTo(map);
    overlays["Safety heatmap"] = heat;
"#;

/// Replaces each `{{NAME}}` in `template` with its value from `values`.
///
/// Unknown placeholders are left untouched.
#[must_use]
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
