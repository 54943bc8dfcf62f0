//! Per-city summaries and rankings.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use school_safety_analytics_models::{ALL_CITIES, CitySummary};
use school_safety_school_models::SchoolSafetyRecord;

/// Rounds to 2 decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| round2(self.sum / f64::from(self.count)))
    }
}

/// One summary row per city, sorted by city name.
///
/// Absent indices are skipped when averaging; a city with no values for an
/// index gets `None`.
#[must_use]
pub fn city_summary(records: &[SchoolSafetyRecord]) -> Vec<CitySummary> {
    let mut by_city: BTreeMap<&str, (usize, Mean, Mean, Mean)> = BTreeMap::new();

    for record in records {
        let (count, overall, pedestrian, emergency) =
            by_city.entry(record.city.as_str()).or_default();
        *count += 1;
        overall.push(Some(record.overall_safety_index));
        pedestrian.push(record.pedestrian_safety_index);
        emergency.push(record.emergency_safety_index);
    }

    by_city
        .into_iter()
        .map(|(city, (school_count, overall, pedestrian, emergency))| CitySummary {
            city: city.to_string(),
            school_count,
            mean_overall: overall.value(),
            mean_pedestrian: pedestrian.value(),
            mean_emergency: emergency.value(),
        })
        .collect()
}

/// Cities ranked by mean overall index, highest first, truncated to `n`.
///
/// Cities without a mean sort last. Ties keep city order.
#[must_use]
pub fn top_cities(summaries: &[CitySummary], n: usize) -> Vec<CitySummary> {
    let mut ranked = summaries.to_vec();
    ranked.sort_by(|a, b| descending(a.mean_overall, b.mean_overall));
    ranked.truncate(n);
    ranked
}

/// Schools ranked by overall index, highest first, truncated to `n`.
#[must_use]
pub fn top_schools<'a, I>(records: I, n: usize) -> Vec<&'a SchoolSafetyRecord>
where
    I: IntoIterator<Item = &'a SchoolSafetyRecord>,
{
    let mut ranked: Vec<&SchoolSafetyRecord> = records.into_iter().collect();
    ranked.sort_by(|a, b| b.overall_safety_index.total_cmp(&a.overall_safety_index));
    ranked.truncate(n);
    ranked
}

/// Records for one city, or all of them for `None` / `"All"`.
#[must_use]
pub fn filter_by_city<'a>(
    records: &'a [SchoolSafetyRecord],
    selection: Option<&str>,
) -> Vec<&'a SchoolSafetyRecord> {
    match selection {
        None => records.iter().collect(),
        Some(city) if city == ALL_CITIES => records.iter().collect(),
        Some(city) => records.iter().filter(|r| r.city == city).collect(),
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use school_safety_school_models::Presence;

    fn record(city: &str, name: &str, overall: f64, pedestrian: Option<f64>) -> SchoolSafetyRecord {
        SchoolSafetyRecord {
            school_name: name.to_string(),
            city: city.to_string(),
            lat: 28.6,
            lon: 77.2,
            overall_safety_index: overall,
            pedestrian_safety_index: pedestrian,
            emergency_safety_index: None,
            traffic_light: Presence::Unknown,
            crosswalk: Presence::Unknown,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn summarizes_each_city_once() {
        let records = vec![
            record("Mumbai", "M1", 10.0, Some(20.0)),
            record("Delhi", "D1", 10.0, None),
            record("Delhi", "D2", 20.0, Some(33.333)),
            record("Delhi", "D3", 25.0, None),
        ];
        let summary = city_summary(&records);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].city, "Delhi");
        assert_eq!(summary[0].school_count, 3);
        assert_eq!(summary[0].mean_overall, Some(18.33));
        assert_eq!(summary[0].mean_pedestrian, Some(33.33));
        assert_eq!(summary[0].mean_emergency, None);
        assert_eq!(summary[1].city, "Mumbai");
    }

    #[test]
    fn ranks_cities_by_mean_overall() {
        let records = vec![
            record("A", "a", 10.0, None),
            record("B", "b", 50.0, None),
            record("C", "c", 30.0, None),
        ];
        let top = top_cities(&city_summary(&records), 2);
        let cities: Vec<&str> = top.iter().map(|s| s.city.as_str()).collect();
        assert_eq!(cities, vec!["B", "C"]);
    }

    #[test]
    fn top_schools_is_stable_for_ties() {
        let records = vec![
            record("A", "first", 40.0, None),
            record("A", "low", 5.0, None),
            record("A", "second", 40.0, None),
            record("A", "best", 90.0, None),
        ];
        let names: Vec<&str> = top_schools(&records, 3)
            .iter()
            .map(|r| r.school_name.as_str())
            .collect();
        assert_eq!(names, vec!["best", "first", "second"]);
    }

    #[test]
    fn filter_all_returns_everything() {
        let records = vec![record("Delhi", "a", 1.0, None), record("Pune", "b", 2.0, None)];
        assert_eq!(filter_by_city(&records, None).len(), 2);
        assert_eq!(filter_by_city(&records, Some("All")).len(), 2);
        assert_eq!(filter_by_city(&records, Some("Pune"))[0].school_name, "b");
        assert!(filter_by_city(&records, Some("Goa")).is_empty());
    }
}
