//! Histogram, infrastructure, and band counts for the dashboard charts.

use school_safety_analytics_models::{
    BandCounts, HISTOGRAM_BIN_WIDTH, HISTOGRAM_MAX, HistogramBin, InfrastructureField,
    PresenceCounts, SafetyBand,
};
use school_safety_school_models::{Presence, SchoolSafetyRecord};

/// Counts `values` into fixed bins of [`HISTOGRAM_BIN_WIDTH`] over
/// `[0, HISTOGRAM_MAX]`.
///
/// Bins are half-open except the last, which also takes `HISTOGRAM_MAX`.
/// Absent and out-of-range values are ignored.
#[must_use]
pub fn histogram<I>(values: I) -> Vec<HistogramBin>
where
    I: IntoIterator<Item = Option<f64>>,
{
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bin_count = (HISTOGRAM_MAX / HISTOGRAM_BIN_WIDTH).round() as usize;

    #[allow(clippy::cast_precision_loss)]
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: i as f64 * HISTOGRAM_BIN_WIDTH,
            upper: (i + 1) as f64 * HISTOGRAM_BIN_WIDTH,
            count: 0,
        })
        .collect();

    for value in values.into_iter().flatten() {
        if !(0.0..=HISTOGRAM_MAX).contains(&value) {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = ((value / HISTOGRAM_BIN_WIDTH).floor() as usize).min(bin_count - 1);
        bins[index].count += 1;
    }

    bins
}

/// Present / absent / unknown counts for one infrastructure field.
#[must_use]
pub fn presence_counts<'a, I>(records: I, field: InfrastructureField) -> PresenceCounts
where
    I: IntoIterator<Item = &'a SchoolSafetyRecord>,
{
    let mut counts = PresenceCounts::default();
    for record in records {
        let value = match field {
            InfrastructureField::TrafficLight => record.traffic_light,
            InfrastructureField::Crosswalk => record.crosswalk,
        };
        match value {
            Presence::Present => counts.present += 1,
            Presence::Absent => counts.absent += 1,
            Presence::Unknown => counts.unknown += 1,
        }
    }
    counts
}

/// Schools per dashboard band for the chosen index.
///
/// A missing index counts as 0 and so lands in [`SafetyBand::Low`].
#[must_use]
pub fn safety_bands<I>(values: I) -> BandCounts
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut counts = BandCounts::default();
    for value in values {
        if let Some(band) = SafetyBand::of(value.unwrap_or(0.0)) {
            counts.increment(band);
        }
    }
    counts
}
