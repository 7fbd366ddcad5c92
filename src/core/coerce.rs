//! Lenient scalar conversions. None of these fail: anything that cannot be
//! read degrades to `None` or an empty string.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid numeric regex")
});

const TRUTHY: [&str; 7] = ["1", "true", "t", "y", "yes", "si", "s"];
const FALSY: [&str; 5] = ["0", "false", "f", "n", "no"];

pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text form of a value; strings are trimmed, null is empty.
pub fn normalize_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => stringify(other),
    }
}

/// Text form of a value as it appears in the source, without trimming.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Reads a number from text or a numeric value. A lone comma is taken as
/// the decimal separator ("1234,56"). Like a lenient float parser, a leading
/// numeric prefix is accepted ("12 kg" reads as 12).
pub fn parse_numberish(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_numeric_text(s),
        _ => None,
    }
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replacen(',', ".", 1)
    } else {
        trimmed.to_string()
    };

    let prefix = NUMERIC_PREFIX.find(&normalized)?;
    prefix
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

/// Two decimals, or empty when there is no value.
pub fn format_price(value: Option<f64>) -> String {
    match value {
        // -0.0 would otherwise render as "-0.00"
        Some(v) if v == 0.0 => "0.00".to_string(),
        Some(v) => format!("{:.2}", v),
        None => String::new(),
    }
}

/// Lower-case ASCII slug: runs of anything outside `[a-z0-9]` collapse to a
/// single '-', with no leading or trailing '-'.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut prev_dash = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    slug.trim_matches('-').to_string()
}

/// `Some(true)`, `Some(false)`, or `None` when the value is not one of the
/// known tokens. Callers pick the default for `None`.
pub fn parse_boolish(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => {
            let token = s.trim().to_lowercase();
            if TRUTHY.contains(&token.as_str()) {
                Some(true)
            } else if FALSY.contains(&token.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}
