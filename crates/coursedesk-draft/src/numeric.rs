//! Coercion of numeric form input.
//!
//! Numeric fields are edited as free text and converted at submission time
//! with the same rules a browser applies to `Number(text)`: surrounding
//! whitespace is ignored, an empty string is zero, decimal and exponent
//! forms and `0x` / `0o` / `0b` literals are accepted. Anything else is not a
//! number and becomes [`SENTINEL`] instead of propagating NaN.

use tracing::debug;

use crate::error::{DraftError, Result};

/// Value substituted for input that is not a number.
pub const SENTINEL: f64 = 0.0;

/// Parse `input` the way `Number(input)` does. `None` stands for NaN.
pub fn js_number(input: &str) -> Option<f64> {
    let s = input.trim();
    if s.is_empty() {
        return Some(0.0);
    }

    if let Some(v) = radix_literal(s) {
        return v;
    }

    let (sign, unsigned) = match s.as_bytes()[0] {
        b'+' => (1.0, &s[1..]),
        b'-' => (-1.0, &s[1..]),
        _ => (1.0, s),
    };
    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }
    if !is_decimal_literal(unsigned) {
        return None;
    }
    unsigned.parse::<f64>().ok().map(|v| sign * v)
}

/// Coerce a form value, substituting [`SENTINEL`] for non-numbers.
///
/// Infinite results cannot be represented on the wire and are rejected.
pub fn coerce(field: &str, input: &str) -> Result<f64> {
    match js_number(input) {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(DraftError::NonFinite {
            field: field.to_string(),
            input: input.to_string(),
        }),
        None => {
            debug!(field, input, "not a number, using sentinel");
            Ok(SENTINEL)
        }
    }
}

// `Some(None)` means "looked like a radix literal but had bad digits".
fn radix_literal(s: &str) -> Option<Option<f64>> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return None;
    }
    let radix = match bytes[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };
    let digits = &s[2..];
    if digits.is_empty() {
        return Some(None);
    }
    let mut value = 0.0f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = value * radix as f64 + d as f64,
            None => return Some(None),
        }
    }
    Some(Some(value))
}

// digits [ "." digits ] [ exponent ], with at least one digit in the mantissa.
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut mantissa_digits = 0;

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        mantissa_digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return false;
        }
    }

    i == bytes.len()
}
