//! Per-city merge of the overall, pedestrian, and final tables.
//!
//! The overall table is the base: it supplies one record per row. The
//! pedestrian and final tables are attached to it either by school name or,
//! when a table carries no names at all, by row position. A table where only
//! some rows are named is rejected. Both strategies require
//! the secondary table to have exactly as many rows as the overall table.
//!
//! Name joins pair the n-th overall row named X with the n-th secondary row
//! named X, so schools sharing a name within a city still line up as long
//! as their relative order is the same in both files.

use std::collections::HashMap;

use school_safety_school_models::{RECORD_COLUMNS, SchoolSafetyRecord};
use school_safety_source_models::SourceCategory;
use serde_json::Value;

use crate::LoadError;
use crate::parsing::{canonicalize_city, parse_number, parse_presence};
use crate::table::{RawTable, Row};

/// Column used as the join key.
const SCHOOL_NAME: &str = "school_name";

/// The three tables of a complete city bundle.
#[derive(Debug, Clone)]
pub struct CityTables {
    /// Base table.
    pub overall: RawTable,
    /// Pedestrian safety index table.
    pub pedestrian: RawTable,
    /// Infrastructure table.
    pub infrastructure: RawTable,
}

/// How a secondary table was matched to the overall table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Matched on `school_name` plus occurrence ordinal.
    SchoolName,
    /// Matched on row index.
    Positional,
}

/// Merges one city's tables into records stamped with the canonical city
/// name.
///
/// # Errors
///
/// Returns [`LoadError::RowAlignment`] or [`LoadError::UnmatchedSchool`] if
/// a secondary table cannot be aligned with the overall table, and
/// [`LoadError::MissingColumn`], [`LoadError::MissingField`], or
/// [`LoadError::InvalidField`] for unusable cells.
pub fn merge_city(
    city_key: &str,
    tables: &CityTables,
) -> Result<Vec<SchoolSafetyRecord>, LoadError> {
    let city = canonicalize_city(city_key);

    tables.pedestrian.require_column("pedestrian_safety_index")?;
    tables.infrastructure.require_column("traffic_light")?;
    tables.infrastructure.require_column("crosswalk")?;

    let names = tables
        .overall
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| required_text(&tables.overall, i, row, SCHOOL_NAME))
        .collect::<Result<Vec<_>, _>>()?;

    let (pedestrian_rows, pedestrian_join) =
        align(&city, SourceCategory::Pedestrian, &names, &tables.pedestrian)?;
    let (infra_rows, infra_join) =
        align(&city, SourceCategory::Final, &names, &tables.infrastructure)?;
    log::debug!(
        "{city}: pedestrian joined by {pedestrian_join:?}, final joined by {infra_join:?}"
    );

    let mut records = Vec::with_capacity(names.len());
    for (i, (row, school_name)) in tables.overall.rows().iter().zip(names).enumerate() {
        let overall = &tables.overall;
        let pedestrian_row = &tables.pedestrian.rows()[pedestrian_rows[i]];
        let infra_row = &tables.infrastructure.rows()[infra_rows[i]];

        let extra = row
            .iter()
            .filter(|(k, _)| !RECORD_COLUMNS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        records.push(SchoolSafetyRecord {
            school_name,
            city: city.clone(),
            lat: required_number(overall, i, row, "lat")?,
            lon: required_number(overall, i, row, "lon")?,
            overall_safety_index: required_number(overall, i, row, "overall_safety_index")?,
            pedestrian_safety_index: optional_number(
                &tables.pedestrian,
                pedestrian_rows[i],
                pedestrian_row,
                "pedestrian_safety_index",
            )?,
            emergency_safety_index: optional_number(overall, i, row, "emergency_safety_index")?,
            traffic_light: presence(
                &tables.infrastructure,
                infra_rows[i],
                infra_row,
                "traffic_light",
            )?,
            crosswalk: presence(&tables.infrastructure, infra_rows[i], infra_row, "crosswalk")?,
            extra,
        });
    }

    Ok(records)
}

/// Maps each overall row index to its row index in `secondary`.
fn align(
    city: &str,
    category: SourceCategory,
    names: &[String],
    secondary: &RawTable,
) -> Result<(Vec<usize>, JoinStrategy), LoadError> {
    if secondary.len() != names.len() {
        return Err(LoadError::RowAlignment {
            city: city.to_string(),
            category,
            expected: names.len(),
            actual: secondary.len(),
        });
    }

    let is_named = |row: &Row| matches!(row.get(SCHOOL_NAME), Some(Value::String(_)));
    if !secondary.rows().iter().any(is_named) {
        return Ok(((0..names.len()).collect(), JoinStrategy::Positional));
    }
    if let Some(unnamed) = secondary.rows().iter().position(|row| !is_named(row)) {
        return Err(missing(secondary, unnamed, SCHOOL_NAME));
    }

    let mut by_key: HashMap<(&str, usize), usize> = HashMap::with_capacity(secondary.len());
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (index, row) in secondary.rows().iter().enumerate() {
        if let Some(Value::String(name)) = row.get(SCHOOL_NAME) {
            let ordinal = seen.entry(name.as_str()).or_insert(0);
            by_key.insert((name.as_str(), *ordinal), index);
            *ordinal += 1;
        }
    }

    let mut ordinals: HashMap<&str, usize> = HashMap::new();
    let mut mapping = Vec::with_capacity(names.len());
    for name in names {
        let ordinal = ordinals.entry(name.as_str()).or_insert(0);
        let Some(index) = by_key.remove(&(name.as_str(), *ordinal)) else {
            return Err(LoadError::UnmatchedSchool {
                city: city.to_string(),
                category,
                school_name: name.clone(),
            });
        };
        *ordinal += 1;
        mapping.push(index);
    }

    Ok((mapping, JoinStrategy::SchoolName))
}

fn required_text(
    table: &RawTable,
    row_index: usize,
    row: &Row,
    field: &str,
) -> Result<String, LoadError> {
    match row.get(field) {
        None | Some(Value::Null) => Err(missing(table, row_index, field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(invalid(
            table,
            row_index,
            field,
            format!("expected text, got {other}"),
        )),
    }
}

fn required_number(
    table: &RawTable,
    row_index: usize,
    row: &Row,
    field: &str,
) -> Result<f64, LoadError> {
    optional_number(table, row_index, row, field)?
        .ok_or_else(|| missing(table, row_index, field))
}

fn optional_number(
    table: &RawTable,
    row_index: usize,
    row: &Row,
    field: &str,
) -> Result<Option<f64>, LoadError> {
    parse_number(row.get(field)).map_err(|message| invalid(table, row_index, field, message))
}

fn presence(
    table: &RawTable,
    row_index: usize,
    row: &Row,
    field: &str,
) -> Result<school_safety_school_models::Presence, LoadError> {
    parse_presence(row.get(field)).map_err(|message| invalid(table, row_index, field, message))
}

fn missing(table: &RawTable, row: usize, field: &str) -> LoadError {
    LoadError::MissingField {
        path: table.path().to_path_buf(),
        row,
        field: field.to_string(),
    }
}

fn invalid(table: &RawTable, row: usize, field: &str, message: String) -> LoadError {
    LoadError::InvalidField {
        path: table.path().to_path_buf(),
        row,
        field: field.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use school_safety_school_models::Presence;
    use serde_json::json;

    use super::*;

    fn table(name: &str, value: Value) -> RawTable {
        RawTable::from_value(Path::new(name), value).unwrap()
    }

    fn delhi_tables(pedestrian: Value, infrastructure: Value) -> CityTables {
        CityTables {
            overall: table(
                "delhi_overall.json",
                json!([
                    {
                        "school_name": "Alpha", "lat": 28.61, "lon": 77.20,
                        "overall_safety_index": 45.0, "emergency_safety_index": 20.0,
                        "ward": "N"
                    },
                    {
                        "school_name": "Beta", "lat": 28.62, "lon": 77.21,
                        "overall_safety_index": 12.5
                    },
                    {
                        "school_name": "Gamma", "lat": 28.63, "lon": 77.22,
                        "overall_safety_index": 3.0
                    }
                ]),
            ),
            pedestrian: table("delhi_pedestrian.json", pedestrian),
            infrastructure: table("delhi_final.json", infrastructure),
        }
    }

    #[test]
    fn positional_join_when_secondary_has_no_names() {
        let tables = delhi_tables(
            json!([
                {"pedestrian_safety_index": 10.0},
                {"pedestrian_safety_index": 20.0},
                {"pedestrian_safety_index": null}
            ]),
            json!([
                {"traffic_light": true, "crosswalk": false},
                {"traffic_light": "no", "crosswalk": 1},
                {"traffic_light": null, "crosswalk": "yes"}
            ]),
        );

        let records = merge_city("delhi", &tables).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.city == "Delhi"));

        assert_eq!(records[0].school_name, "Alpha");
        assert_eq!(records[0].pedestrian_safety_index, Some(10.0));
        assert_eq!(records[0].emergency_safety_index, Some(20.0));
        assert_eq!(records[0].traffic_light, Presence::Present);
        assert_eq!(records[0].crosswalk, Presence::Absent);
        assert_eq!(records[0].extra.get("ward"), Some(&json!("N")));

        assert_eq!(records[1].traffic_light, Presence::Absent);
        assert_eq!(records[1].crosswalk, Presence::Present);
        assert_eq!(records[1].emergency_safety_index, None);

        assert_eq!(records[2].pedestrian_safety_index, None);
        assert_eq!(records[2].traffic_light, Presence::Unknown);
    }

    #[test]
    fn name_join_survives_reordered_secondary() {
        let tables = delhi_tables(
            json!([
                {"school_name": "Gamma", "pedestrian_safety_index": 3.3},
                {"school_name": "Alpha", "pedestrian_safety_index": 1.1},
                {"school_name": "Beta", "pedestrian_safety_index": 2.2}
            ]),
            json!([
                {"school_name": "Beta", "traffic_light": false, "crosswalk": false},
                {"school_name": "Gamma", "traffic_light": false, "crosswalk": true},
                {"school_name": "Alpha", "traffic_light": true, "crosswalk": true}
            ]),
        );

        let records = merge_city("delhi", &tables).unwrap();
        let by_name: HashMap<&str, &SchoolSafetyRecord> =
            records.iter().map(|r| (r.school_name.as_str(), r)).collect();

        assert_eq!(by_name["Alpha"].pedestrian_safety_index, Some(1.1));
        assert_eq!(by_name["Beta"].pedestrian_safety_index, Some(2.2));
        assert_eq!(by_name["Gamma"].pedestrian_safety_index, Some(3.3));
        assert_eq!(by_name["Alpha"].traffic_light, Presence::Present);
        assert_eq!(by_name["Gamma"].crosswalk, Presence::Present);
        assert_eq!(by_name["Beta"].crosswalk, Presence::Absent);
        // Output keeps overall row order.
        assert_eq!(records[0].school_name, "Alpha");
    }

    #[test]
    fn name_join_pairs_duplicate_names_in_order() {
        let tables = CityTables {
            overall: table(
                "pune_overall.json",
                json!([
                    {
                        "school_name": "Public School", "lat": 18.5, "lon": 73.8,
                        "overall_safety_index": 50.0
                    },
                    {
                        "school_name": "Public School", "lat": 18.6, "lon": 73.9,
                        "overall_safety_index": 5.0
                    }
                ]),
            ),
            pedestrian: table(
                "pune_pedestrian.json",
                json!([
                    {"school_name": "Public School", "pedestrian_safety_index": 1.0},
                    {"school_name": "Public School", "pedestrian_safety_index": 2.0}
                ]),
            ),
            infrastructure: table(
                "pune_final.json",
                json!([
                    {"traffic_light": true, "crosswalk": true},
                    {"traffic_light": false, "crosswalk": false}
                ]),
            ),
        };

        let records = merge_city("pune", &tables).unwrap();
        assert_eq!(records[0].pedestrian_safety_index, Some(1.0));
        assert_eq!(records[1].pedestrian_safety_index, Some(2.0));
    }

    #[test]
    fn unmatched_name_fails() {
        let tables = delhi_tables(
            json!([
                {"school_name": "Alpha", "pedestrian_safety_index": 1.0},
                {"school_name": "Beta", "pedestrian_safety_index": 2.0},
                {"school_name": "Delta", "pedestrian_safety_index": 4.0}
            ]),
            json!([
                {"traffic_light": true, "crosswalk": true},
                {"traffic_light": true, "crosswalk": true},
                {"traffic_light": true, "crosswalk": true}
            ]),
        );

        let err = merge_city("delhi", &tables).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnmatchedSchool {
                ref city,
                category: SourceCategory::Pedestrian,
                ref school_name,
            } if city == "Delhi" && school_name == "Gamma"
        ));
    }

    #[test]
    fn partially_named_secondary_fails_instead_of_joining_by_position() {
        let tables = delhi_tables(
            json!([
                {"school_name": "Beta", "pedestrian_safety_index": 99.0},
                {"pedestrian_safety_index": 11.0},
                {"school_name": "Gamma", "pedestrian_safety_index": 3.0}
            ]),
            json!([
                {"traffic_light": true, "crosswalk": true},
                {"traffic_light": true, "crosswalk": true},
                {"traffic_light": true, "crosswalk": true}
            ]),
        );

        let err = merge_city("delhi", &tables).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingField { ref path, row: 1, ref field }
                if field == "school_name" && path == Path::new("delhi_pedestrian.json")
        ));
    }

    #[test]
    fn row_count_mismatch_fails() {
        let tables = delhi_tables(
            json!([
                {"pedestrian_safety_index": 1.0},
                {"pedestrian_safety_index": 2.0},
                {"pedestrian_safety_index": 3.0}
            ]),
            json!([
                {"traffic_light": true, "crosswalk": true},
                {"traffic_light": true, "crosswalk": true}
            ]),
        );

        let err = merge_city("delhi", &tables).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RowAlignment {
                category: SourceCategory::Final,
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn missing_coordinate_fails_with_row_context() {
        let tables = CityTables {
            overall: table(
                "goa_overall.json",
                json!([
                    {"school_name": "A", "lat": null, "lon": 73.8, "overall_safety_index": 5.0}
                ]),
            ),
            pedestrian: table("goa_pedestrian.json", json!([{"pedestrian_safety_index": 1.0}])),
            infrastructure: table(
                "goa_final.json",
                json!([{"traffic_light": true, "crosswalk": true}]),
            ),
        };

        let err = merge_city("goa", &tables).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingField { row: 0, ref field, .. } if field == "lat"
        ));
    }

    #[test]
    fn missing_infrastructure_column_fails() {
        let tables = delhi_tables(
            json!([
                {"pedestrian_safety_index": 1.0},
                {"pedestrian_safety_index": 2.0},
                {"pedestrian_safety_index": 3.0}
            ]),
            json!([
                {"traffic_light": true},
                {"traffic_light": true},
                {"traffic_light": true}
            ]),
        );

        let err = merge_city("delhi", &tables).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn { ref column, .. } if column == "crosswalk"
        ));
    }
}
