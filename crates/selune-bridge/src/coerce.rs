//! Type coercion helpers for Lua 5.4 semantics.

use selune_core::string::StringInterner;
use selune_core::value::TValue;

/// Try to convert a TValue to f64 (number coercion).
/// Integers convert to float; strings that look like numbers also convert.
pub fn to_number(v: TValue, strings: &StringInterner) -> Option<f64> {
    match v {
        TValue::Float(f) => Some(f),
        TValue::Integer(i) => Some(i as f64),
        TValue::String(sid) => {
            let s = std::str::from_utf8(strings.get_bytes(sid)).ok()?.trim();
            parse_decimal(s).or_else(|| parse_hex(s).map(|i| i as f64))
        }
        _ => None,
    }
}

/// Try to convert a TValue to i64 (integer coercion).
pub fn to_integer(v: TValue, strings: &StringInterner) -> Option<i64> {
    match v {
        TValue::Integer(i) => Some(i),
        TValue::Float(f) => float_to_integer(f),
        TValue::String(sid) => {
            let s = std::str::from_utf8(strings.get_bytes(sid)).ok()?.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(i)
            } else if let Some(i) = parse_hex(s) {
                Some(i)
            } else {
                parse_decimal(s).and_then(float_to_integer)
            }
        }
        _ => None,
    }
}

/// Decimal numerals only; "inf" and "nan" are not numbers.
fn parse_decimal(s: &str) -> Option<f64> {
    if s.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b)) {
        s.parse().ok()
    } else {
        None
    }
}

fn parse_hex(s: &str) -> Option<i64> {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let hex = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"))?;
    // Lua wraps hex integer literals around
    let v = u64::from_str_radix(hex, 16).ok()? as i64;
    Some(if neg { v.wrapping_neg() } else { v })
}

/// Convert a float to integer if it has no fractional part.
pub fn float_to_integer(f: f64) -> Option<i64> {
    // 2^63 as f64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

/// String form of a number, as `tostring` would produce it.
pub fn number_to_string(v: TValue) -> Option<String> {
    match v {
        TValue::Integer(i) => Some(i.to_string()),
        TValue::Float(f) => Some(lua_format_float(f)),
        _ => None,
    }
}

/// Format a float the way Lua 5.4 does: integral floats keep a ".0".
pub fn lua_format_float(f: f64) -> String {
    if f.is_nan() {
        String::from(if f.is_sign_negative() { "-nan" } else { "nan" })
    } else if f.is_infinite() {
        String::from(if f > 0.0 { "inf" } else { "-inf" })
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}
