//! Kubernetes resource quantity normalization
//!
//! Converts quantity strings as reported by the API server and the
//! metrics-server into canonical units:
//! - CPU in fractional cores (`n`, `u`, `m` suffixes or bare cores)
//! - Memory in bytes (`Ki` through `Ei` binary suffixes or bare bytes)
//!
//! The `parse_*` functions are total: anything that is not a recognized
//! quantity becomes `0.0`. This means a malformed quantity cannot be told
//! apart from an explicit zero once aggregated. Callers that care use the
//! `*_strict` variants, which report why a value was rejected.

use thiserror::Error;

/// Bytes in one gibibyte
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Binary memory suffixes and their multipliers, longest match first
const MEMORY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

/// CPU scale suffixes and their divisors (value / divisor = cores)
const CPU_SUFFIXES: &[(char, f64)] = &[('n', 1e9), ('u', 1e6), ('m', 1e3)];

/// Reasons a quantity string was rejected by strict parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("unrecognized quantity suffix in {0:?}")]
    UnknownSuffix(String),

    #[error("invalid numeric value in {0:?}")]
    InvalidNumber(String),
}

/// Parse a memory quantity into bytes, folding anything unparseable to zero
pub fn parse_memory(quantity: &str) -> f64 {
    parse_memory_strict(quantity).unwrap_or(0.0)
}

/// Parse a CPU quantity into cores, folding anything unparseable to zero
pub fn parse_cpu(quantity: &str) -> f64 {
    parse_cpu_strict(quantity).unwrap_or(0.0)
}

/// Parse an optional memory quantity; absence is zero
pub fn parse_memory_opt(quantity: Option<&str>) -> f64 {
    quantity.map(parse_memory).unwrap_or(0.0)
}

/// Parse an optional CPU quantity; absence is zero
pub fn parse_cpu_opt(quantity: Option<&str>) -> f64 {
    quantity.map(parse_cpu).unwrap_or(0.0)
}

/// Parse a memory quantity into bytes, reporting malformed input
pub fn parse_memory_strict(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    for (suffix, multiplier) in MEMORY_SUFFIXES {
        if let Some(value) = quantity.strip_suffix(suffix) {
            return parse_number(value, quantity).map(|v| v * multiplier);
        }
    }

    if quantity.ends_with(|c: char| c.is_ascii_alphabetic()) && !is_exponent_form(quantity) {
        return Err(QuantityError::UnknownSuffix(quantity.to_string()));
    }

    parse_number(quantity, quantity)
}

/// Parse a CPU quantity into cores, reporting malformed input
pub fn parse_cpu_strict(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    for (suffix, divisor) in CPU_SUFFIXES {
        if let Some(value) = quantity.strip_suffix(*suffix) {
            return parse_number(value, quantity).map(|v| v / divisor);
        }
    }

    if quantity.ends_with(|c: char| c.is_ascii_alphabetic()) && !is_exponent_form(quantity) {
        return Err(QuantityError::UnknownSuffix(quantity.to_string()));
    }

    parse_number(quantity, quantity)
}

/// Convert bytes to gibibytes
pub fn bytes_to_gib(bytes: f64) -> f64 {
    bytes / BYTES_PER_GIB
}

fn parse_number(value: &str, original: &str) -> Result<f64, QuantityError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(QuantityError::InvalidNumber(original.to_string())),
    }
}

// "1e3" ends in a digit, but guard against things like "1e" slipping
// through as an unknown suffix when they are really bad numbers
fn is_exponent_form(quantity: &str) -> bool {
    quantity.ends_with(['e', 'E'])
        && quantity[..quantity.len() - 1]
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.')
}
