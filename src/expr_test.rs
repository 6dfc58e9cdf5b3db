use super::*;
use serde_json::json;

fn names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| (*s).to_owned()).collect())
}

// =========================================================================
// extract_variables
// =========================================================================

#[test]
fn extract_returns_none_for_absent_or_empty() {
    assert_eq!(extract_variables(None), None);
    assert_eq!(extract_variables(Some("")), None);
}

#[test]
fn extract_returns_none_without_placeholders() {
    assert_eq!(extract_variables(Some("plain text")), None);
    assert_eq!(extract_variables(Some("cost: $5 {ok}")), None);
}

#[test]
fn extract_single_placeholder() {
    assert_eq!(extract_variables(Some("${greeting} there")), names(&["greeting"]));
}

#[test]
fn extract_keeps_occurrence_order() {
    assert_eq!(extract_variables(Some("${b} and ${a} then ${c}")), names(&["b", "a", "c"]));
}

#[test]
fn extract_keeps_duplicates() {
    assert_eq!(extract_variables(Some("${a}${a} ${b} ${a}")), names(&["a", "a", "b", "a"]));
}

#[test]
fn extract_accepts_alphanumeric_names_only() {
    assert_eq!(extract_variables(Some("${user_name} ${first-name} ${ } ${}")), None);
    assert_eq!(extract_variables(Some("${item2} ${2fast} ${ABC}")), names(&["item2", "2fast", "ABC"]));
}

#[test]
fn extract_leaves_malformed_tokens_alone() {
    assert_eq!(extract_variables(Some("${open ${closed}")), names(&["closed"]));
    assert_eq!(extract_variables(Some("$name {name} ${name")), None);
}

#[test]
fn extract_is_pure() {
    let text = "${x}-${y}-${x}";
    assert_eq!(extract_variables(Some(text)), extract_variables(Some(text)));
}

// =========================================================================
// substitution
// =========================================================================

#[test]
fn substitute_replaces_only_first_occurrence() {
    assert_eq!(substitute_first("${a} ${a}", "a", "1"), "1 ${a}");
}

#[test]
fn substitute_ignores_missing_placeholder() {
    assert_eq!(substitute_first("no tokens", "a", "1"), "no tokens");
}

#[test]
fn substitute_does_not_match_prefix_names() {
    assert_eq!(substitute_first("${ab} ${a}", "a", "X"), "${ab} X");
}

#[test]
fn placeholder_formats_token() {
    assert_eq!(placeholder("age"), "${age}");
}

// =========================================================================
// display_value
// =========================================================================

#[test]
fn display_strings_are_raw() {
    assert_eq!(display_value(&json!("hi")), "hi");
}

#[test]
fn display_whole_floats_drop_fraction() {
    assert_eq!(display_value(&json!(45.0)), "45");
    assert_eq!(display_value(&json!(30)), "30");
    assert_eq!(display_value(&json!(-2.5)), "-2.5");
}

#[test]
fn display_scalars_and_lists() {
    assert_eq!(display_value(&json!(true)), "true");
    assert_eq!(display_value(&json!(null)), "null");
    assert_eq!(display_value(&json!(["a", 1, false])), "a,1,false");
}

// =========================================================================
// parse_leading_float
// =========================================================================

#[test]
fn parse_plain_numbers() {
    assert_eq!(parse_leading_float("45"), Some(45.0));
    assert_eq!(parse_leading_float("-3.25"), Some(-3.25));
    assert_eq!(parse_leading_float(".5"), Some(0.5));
    assert_eq!(parse_leading_float("1e3"), Some(1000.0));
}

#[test]
fn parse_skips_leading_space_and_trailing_garbage() {
    assert_eq!(parse_leading_float("  12px"), Some(12.0));
    assert_eq!(parse_leading_float("7.5.1"), Some(7.5));
    assert_eq!(parse_leading_float("2e"), Some(2.0));
}

#[test]
fn parse_rejects_non_numbers() {
    assert_eq!(parse_leading_float(""), None);
    assert_eq!(parse_leading_float("abc"), None);
    assert_eq!(parse_leading_float("-"), None);
    assert_eq!(parse_leading_float("."), None);
}

#[test]
fn parse_infinity() {
    assert_eq!(parse_leading_float("Infinity"), Some(f64::INFINITY));
    assert_eq!(parse_leading_float("-Infinity"), Some(f64::NEG_INFINITY));
}
