//! Value coercion for loosely typed source columns.
//!
//! Source tables come from spreadsheets and notebooks, so numbers sometimes
//! arrive as strings and booleans as `"yes"`/`1`. These helpers normalize
//! them and return a short message on failure; callers attach file, row,
//! and field context.

use school_safety_school_models::Presence;
use serde_json::Value;

/// Upper-cases the first character of a city key and leaves the rest as-is.
///
/// `"delhi"` becomes `"Delhi"`, `"newYork"` becomes `"NewYork"`.
#[must_use]
pub fn canonicalize_city(key: &str) -> String {
    let mut chars = key.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Parses an optional numeric cell.
///
/// Missing and `null` cells are `Ok(None)`, as are blank strings.
///
/// # Errors
///
/// Returns a message if the value is not a finite number or numeric string.
pub fn parse_number(value: Option<&Value>) -> Result<Option<f64>, String> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("number {n} is not representable as f64"))?,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| format!("expected a number, got \"{s}\""))?
        }
        Some(other) => return Err(format!("expected a number, got {other}")),
    };

    if number.is_finite() {
        Ok(Some(number))
    } else {
        Err(format!("expected a finite number, got {number}"))
    }
}

/// Parses a boolean-like infrastructure cell into a [`Presence`].
///
/// Accepts JSON booleans, `1`/`0`, and the case-insensitive strings
/// `true/false/yes/no/y/n/1/0`. Missing, `null`, and blank cells are
/// [`Presence::Unknown`].
///
/// # Errors
///
/// Returns a message for any other value.
pub fn parse_presence(value: Option<&Value>) -> Result<Presence, String> {
    match value {
        None | Some(Value::Null) => Ok(Presence::Unknown),
        Some(Value::Bool(b)) => Ok(Presence::from(Some(*b))),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if (v - 1.0).abs() < f64::EPSILON => Ok(Presence::Present),
            Some(v) if v.abs() < f64::EPSILON => Ok(Presence::Absent),
            _ => Err(format!("expected 0 or 1, got {n}")),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Presence::Unknown),
            "true" | "yes" | "y" | "1" => Ok(Presence::Present),
            "false" | "no" | "n" | "0" => Ok(Presence::Absent),
            _ => Err(format!("expected a yes/no value, got \"{s}\"")),
        },
        Some(other) => Err(format!("expected a yes/no value, got {other}")),
    }
}
