//! Placeholder expressions: `${name}` tokens inside text and attribute values.
//!
//! Only flat substitution exists. A name is one or more ASCII letters or
//! digits; anything else that merely looks like `${` is left alone.

#[cfg(test)]
#[path = "expr_test.rs"]
mod expr_test;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9]+)\}").expect("placeholder pattern compiles"));

/// Names referenced by placeholders in `text`, left to right, duplicates kept.
///
/// Returns `None` (never an empty list) when `text` is absent, empty, or has
/// no placeholders. Callers treat `None` as "nothing to bind here".
#[must_use]
pub fn extract_variables(text: Option<&str>) -> Option<Vec<String>> {
    let text = text.filter(|t| !t.is_empty())?;
    let names: Vec<String> = PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .collect();

    if names.is_empty() { None } else { Some(names) }
}

/// Replace the first `${name}` in `text` with `value`.
#[must_use]
pub fn substitute_first(text: &str, name: &str, value: &str) -> String {
    text.replacen(&placeholder(name), value, 1)
}

/// The literal token for `name`, e.g. `${greeting}`.
#[must_use]
pub fn placeholder(name: &str) -> String {
    format!("${{{name}}}")
}

/// String form of a data value as it appears in rendered text.
///
/// Strings are inserted raw, whole floats drop their fraction (`45`, not
/// `45.0`), and `null` renders as `null`.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => display_float(f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_owned(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn display_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// Parse the leading decimal number of `raw`, the way form inputs are read.
///
/// Leading whitespace is skipped and trailing garbage ignored (`"45px"` is
/// `45`). Returns `None` when no number starts the string.
#[must_use]
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if s[end..].starts_with("Infinity") {
        return Some(if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = digits(end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }

    match s[..end].parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => None,
    }
}
