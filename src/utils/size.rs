//! Human-readable size strings ("1.2 GB") to byte counts

use crate::error::GrabError;
use regex::Regex;

/// Decimal multiplier for a size unit. The table is fixed: KB, MB, GB, TB.
pub fn unit_multiplier(unit: &str) -> Option<f64> {
    match unit.to_ascii_uppercase().as_str() {
        "KB" => Some(1e3),
        "MB" => Some(1e6),
        "GB" => Some(1e9),
        "TB" => Some(1e12),
        _ => None,
    }
}

/// Convert a `"<number> <unit>"` string into bytes
pub fn convert_to_bytes(text: &str) -> Result<u64, GrabError> {
    let pattern = Regex::new(r"^\s*(\d+(?:\.\d*)?|\.\d+)\s*([A-Za-z]+)\s*$")?;
    let caps = pattern
        .captures(text)
        .ok_or_else(|| GrabError::InvalidSize(text.to_string()))?;

    let number: f64 = caps[1]
        .parse()
        .map_err(|_| GrabError::InvalidSize(text.to_string()))?;
    let multiplier =
        unit_multiplier(&caps[2]).ok_or_else(|| GrabError::InvalidSize(text.to_string()))?;

    Ok((number * multiplier).round() as u64)
}
