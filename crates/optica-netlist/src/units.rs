//! Length parsing with unit suffixes. All lengths are returned in millimetres.

use crate::ParseError;

const UM_TO_MM: f64 = 1e-3;
const NM_TO_MM: f64 = 1e-6;

/// Parse `"12.5mm"`, `"3um"`, `"633nm"` or a bare number (millimetres).
pub fn parse_length(text: &str) -> Result<f64, ParseError> {
    let (number, scale) = if let Some(n) = text.strip_suffix("mm") {
        (n, 1.0)
    } else if let Some(n) = text.strip_suffix("um") {
        (n, UM_TO_MM)
    } else if let Some(n) = text.strip_suffix("nm") {
        (n, NM_TO_MM)
    } else {
        (text, 1.0)
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidUnit(text.to_string()))?;
    if !value.is_finite() {
        return Err(ParseError::InvalidUnit(text.to_string()));
    }
    Ok(scale * value)
}
