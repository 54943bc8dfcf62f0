//! Plain-text dashboard report.

use std::fmt::Write as _;

use school_safety_analytics::distribution::{histogram, presence_counts, safety_bands};
use school_safety_analytics::summary::{city_summary, filter_by_city, top_cities, top_schools};
use school_safety_analytics_models::{ALL_CITIES, InfrastructureField, SafetyBand};
use school_safety_school_models::AggregatedDataset;

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn write_histogram(out: &mut String, index: &str, values: impl Iterator<Item = Option<f64>>) {
    let _ = writeln!(out, "\n{index} Safety Index Distribution");
    for bin in histogram(values) {
        if bin.count > 0 {
            let _ = writeln!(
                out,
                "{:>5.0}-{:<5.0} {:>6} {}",
                bin.lower,
                bin.upper,
                bin.count,
                "#".repeat(usize::try_from(bin.count.min(60)).unwrap_or(60))
            );
        }
    }
}

/// Formats every dashboard section for `selection` as text.
///
/// The city summary and top-cities tables always cover every city; the
/// remaining sections cover only the selection.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn format_report(dataset: &AggregatedDataset, selection: Option<&str>, top: usize) -> String {
    let mut out = String::new();
    let summaries = city_summary(dataset.records());

    let _ = writeln!(out, "City Safety Summary");
    let _ = writeln!(
        out,
        "{:<24} {:>8} {:>12} {:>15} {:>14}",
        "CITY", "SCHOOLS", "AVG OVERALL", "AVG PEDESTRIAN", "AVG EMERGENCY"
    );
    let _ = writeln!(out, "{}", "-".repeat(77));
    for summary in &summaries {
        let _ = writeln!(
            out,
            "{:<24} {:>8} {:>12} {:>15} {:>14}",
            summary.city,
            summary.school_count,
            cell(summary.mean_overall),
            cell(summary.mean_pedestrian),
            cell(summary.mean_emergency),
        );
    }

    let _ = writeln!(out, "\nTop {top} Safest Cities");
    for (rank, summary) in top_cities(&summaries, top).iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {:<24} {:>8}",
            rank + 1,
            summary.city,
            cell(summary.mean_overall)
        );
    }

    let view = filter_by_city(dataset.records(), selection);
    let _ = writeln!(
        out,
        "\nShowing data for: {} ({} schools)",
        selection.unwrap_or(ALL_CITIES),
        view.len()
    );

    let _ = writeln!(out, "\nTop {top} Safest Schools (by Overall Safety Index)");
    for (rank, record) in top_schools(view.iter().copied(), top).iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {:<40} {:<16} {:>8.2}",
            rank + 1,
            record.school_name,
            record.city,
            record.overall_safety_index
        );
    }

    write_histogram(&mut out, "Overall", view.iter().map(|r| Some(r.overall_safety_index)));
    write_histogram(&mut out, "Pedestrian", view.iter().map(|r| r.pedestrian_safety_index));
    write_histogram(&mut out, "Emergency", view.iter().map(|r| r.emergency_safety_index));

    let _ = writeln!(out, "\nInfrastructure Safety Features");
    for field in InfrastructureField::all() {
        let counts = presence_counts(view.iter().copied(), *field);
        let (yes, no) = counts.chart_counts();
        let _ = writeln!(
            out,
            "{:<14} yes {:>6}  no {:>6}  (of which unknown {})",
            field.label(),
            yes,
            no,
            counts.unknown
        );
    }

    // Secondary indices are banded only where present.
    let _ = writeln!(out, "\nSafety Bands (Overall / Pedestrian / Emergency)");
    let overall = safety_bands(view.iter().map(|r| Some(r.overall_safety_index)));
    let pedestrian = safety_bands(view.iter().filter_map(|r| r.pedestrian_safety_index).map(Some));
    let emergency = safety_bands(view.iter().filter_map(|r| r.emergency_safety_index).map(Some));
    for band in SafetyBand::all() {
        let _ = writeln!(
            out,
            "{:<8} {:>8} {:>8} {:>8}",
            band.label(),
            overall.get(*band),
            pedestrian.get(*band),
            emergency.get(*band)
        );
    }

    out
}
