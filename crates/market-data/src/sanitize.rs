//! Numeric sanitization for vendor payloads.
//!
//! Vendors report missing numbers as `"-"`, empty strings, nulls, or the
//! occasional NaN/Infinity. Everything funnels through these helpers so
//! that a malformed field becomes zero instead of an error or a poisoned
//! value downstream.

use rust_decimal::Decimal;
use serde_json::Value;

/// Convert a float to `Decimal`, coercing NaN/Inf and conversion
/// failures to zero.
pub fn decimal_from_f64(value: f64) -> Decimal {
    if value.is_finite() {
        Decimal::try_from(value).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

/// Parse a string field ("" and "-" are missing-value markers).
pub fn decimal_from_str(value: &str) -> Decimal {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Decimal::ZERO;
    }
    trimmed
        .parse::<f64>()
        .map(decimal_from_f64)
        .unwrap_or(Decimal::ZERO)
}

/// Extract a numeric JSON field as `Decimal`.
///
/// Handles numbers, numeric strings, the `"-"` placeholder, null and a
/// missing key, all of which collapse to zero.
pub fn decimal_field(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(decimal_from_f64).unwrap_or(Decimal::ZERO),
        Some(Value::String(s)) => decimal_from_str(s),
        _ => Decimal::ZERO,
    }
}

/// Extract a numeric JSON field as `u64` (volumes), truncating
/// fractional lots and coercing anything unusable to zero.
pub fn u64_field(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                v
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
                    .unwrap_or(0)
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" {
                0
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
                    .unwrap_or(0)
            }
        }
        _ => 0,
    }
}
