//! Pattern matching
//!
//! A [`Pattern`] is the right-hand side of every leaf filter. It is parsed
//! once when the filter is compiled and then tested against many values.
//!
//! Rules, first applicable wins:
//!
//! 1. `$$pattern` compares against the JSON text of the value instead of the
//!    value itself; the remaining rules then apply to that text.
//! 2. `/regex/` or anything containing `*` is a regular expression when the
//!    value is a string. `/…/` is searched unanchored; `*` patterns only have
//!    `.` escaped and `*` widened to `.*`, and are anchored at both ends.
//! 3. `<=`, `>=`, `<`, `>`, `!=`, `!`, `=` prefixes compare numerically when
//!    the value is a string, a number or a boolean (`true` is 1, `false` 0).
//! 4. Anything else is equality. Numbers and booleans compare by value.
//!
//! Regexes use `fancy_regex`, so look-around and backreferences work.

use std::io;

use fancy_regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

/// Prefix selecting JSON comparison
const JSON_PREFIX: &str = "$$";

/// A compiled pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Pattern as written, `$$` included
    raw: Value,
    /// Compare against the JSON text of the value
    json: bool,
    /// Pattern with the `$$` prefix removed
    operand: Value,
    regex: RegexForm,
    comparison: Option<Comparison>,
}

#[derive(Debug, Clone)]
enum RegexForm {
    Plain,
    Compiled(Regex),
    /// The pattern has regex form but does not compile; it never matches
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    NotEqual,
    Equal,
}

/// Multi-character tokens come first so `<=` is not read as `<`
const COMPARATORS: [(&str, Comparator); 7] = [
    ("<=", Comparator::LessOrEqual),
    (">=", Comparator::GreaterOrEqual),
    ("<", Comparator::Less),
    (">", Comparator::Greater),
    ("!=", Comparator::NotEqual),
    ("!", Comparator::NotEqual),
    ("=", Comparator::Equal),
];

#[derive(Debug, Clone, Copy)]
struct Comparison {
    comparator: Comparator,
    /// `None` when the text after the comparator is not a number
    threshold: Option<f64>,
}

impl Comparator {
    fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::LessOrEqual => value <= threshold,
            Comparator::GreaterOrEqual => value >= threshold,
            Comparator::Less => value < threshold,
            Comparator::Greater => value > threshold,
            Comparator::NotEqual => value != threshold,
            Comparator::Equal => value == threshold,
        }
    }
}

impl Pattern {
    /// Parse a pattern from its declared value
    pub fn new(raw: Value) -> Self {
        let (json, operand) = match raw.as_str().and_then(|s| s.strip_prefix(JSON_PREFIX)) {
            Some(rest) => (true, Value::String(rest.to_string())),
            None => (false, raw.clone()),
        };

        let (regex, comparison) = match operand.as_str() {
            Some(text) => (compile_regex(text), parse_comparison(text)),
            None => (RegexForm::Plain, None),
        };

        Self {
            raw,
            json,
            operand,
            regex,
            comparison,
        }
    }

    /// The pattern as it was declared
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Test a value against this pattern
    pub fn matches(&self, value: &Value) -> bool {
        let serialized;
        let value = if self.json {
            serialized = Value::String(to_json_text(value));
            &serialized
        } else {
            value
        };

        if let Value::String(text) = value {
            match &self.regex {
                RegexForm::Compiled(regex) => return regex_matches(regex, text),
                RegexForm::Invalid => return false,
                RegexForm::Plain => {}
            }
        }

        if let Some(comparison) = self.comparison {
            if matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                return match (numeric_value(value), comparison.threshold) {
                    (Some(number), Some(threshold)) => comparison.comparator.apply(number, threshold),
                    _ => false,
                };
            }
        }

        values_equal(&self.operand, value)
    }
}

impl From<Value> for Pattern {
    fn from(raw: Value) -> Self {
        Pattern::new(raw)
    }
}

/// One-shot match of `pattern` against `value`
pub fn matches(pattern: &Value, value: &Value) -> bool {
    Pattern::new(pattern.clone()).matches(value)
}

fn compile_regex(pattern: &str) -> RegexForm {
    let delimited = pattern.starts_with('/') && pattern.ends_with('/');
    if !delimited && !pattern.contains('*') {
        return RegexForm::Plain;
    }

    let source = if let Some(inner) = pattern.strip_prefix('/') {
        // Interior of /…/; a leading '/' always costs the last character
        match inner.char_indices().next_back() {
            Some((last, _)) => inner[..last].to_string(),
            None => String::new(),
        }
    } else {
        format!("^{}$", pattern.replace('.', "\\.").replace('*', ".*"))
    };

    match Regex::new(&source) {
        Ok(regex) => RegexForm::Compiled(regex),
        Err(e) => {
            error!("Invalid regular expression in pattern '{}': {}", pattern, e);
            RegexForm::Invalid
        }
    }
}

/// A regex that fails at match time, e.g. on the backtrack limit, does not match
fn regex_matches(regex: &Regex, text: &str) -> bool {
    regex.is_match(text).unwrap_or_else(|e| {
        debug!("Regular expression '{}' failed on '{}': {}", regex.as_str(), text, e);
        false
    })
}

fn parse_comparison(pattern: &str) -> Option<Comparison> {
    COMPARATORS.iter().find_map(|(token, comparator)| {
        pattern.strip_prefix(token).map(|rest| Comparison {
            comparator: *comparator,
            threshold: parse_number(rest),
        })
    })
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => parse_number(s),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Equality where numbers compare by value, so `5` equals `5.0` and `1`
/// equals `true`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Bool(_)) | (Value::Bool(_), Value::Number(_)) => {
            numeric_value(a) == numeric_value(b)
        }
        (Value::Number(x), Value::Number(y)) => {
            x == y || matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y)
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).map(|y| values_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// JSON text in the layout `$$` patterns are written against:
/// `", "` and `": "` separators, non-ASCII escaped as `\uXXXX`
pub fn to_json_text(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    if value.serialize(&mut serializer).is_err() {
        return String::new();
    }
    String::from_utf8(out).unwrap_or_default()
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn m(pattern: Value, value: Value) -> bool {
        matches(&pattern, &value)
    }

    #[test]
    fn test_exact_equality() {
        assert!(m(json!("on"), json!("on")));
        assert!(!m(json!("on"), json!("off")));
        assert!(m(json!(5), json!(5)));
        assert!(m(json!(5), json!(5.0)));
        assert!(m(json!(true), json!(true)));
        assert!(!m(json!(true), json!("true")));
        assert!(m(json!(null), json!(null)));
        assert!(!m(json!("5"), json!(5)));
    }

    #[test]
    fn test_wildcard_is_anchored() {
        assert!(m(json!("foo*bar"), json!("foobazbar")));
        assert!(m(json!("foo*bar"), json!("foobar")));
        assert!(!m(json!("foo*bar"), json!("foobar-baz")));
        assert!(!m(json!("foo*bar"), json!("xfoobar")));
        assert!(m(json!("light.*"), json!("light.kitchen")));
        // Dots are literal in wildcard patterns
        assert!(!m(json!("light.*"), json!("lightXkitchen")));
    }

    #[test]
    fn test_slash_regex_is_searched() {
        assert!(m(json!("/^a.*z$/"), json!("abcz")));
        assert!(!m(json!("/^a.*z$/"), json!("abczx")));
        assert!(m(json!("/abc/"), json!("xxabcxx")));
        assert!(m(json!("/kitchen|hall/"), json!("light.hall_ceiling")));
        assert!(m(json!("/"), json!("anything")));
    }

    #[test]
    fn test_regex_needs_string_value() {
        // Not a string: falls through to equality
        assert!(!m(json!("/1/"), json!(1)));
        assert!(!m(json!("1*"), json!(10)));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        assert!(!m(json!("/(unclosed/"), json!("(unclosed")));
        assert!(!m(json!("/(unclosed/"), json!("/(unclosed/")));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(m(json!("<=5"), json!("5")));
        assert!(!m(json!("<5"), json!("5")));
        assert!(m(json!("<5"), json!("4.5")));
        assert!(m(json!(">=5"), json!(5)));
        assert!(m(json!(">5"), json!(5.5)));
        assert!(!m(json!(">5"), json!("5")));
        assert!(m(json!("!5"), json!("6")));
        assert!(!m(json!("!5"), json!("5")));
        assert!(m(json!("!=5"), json!("6")));
        assert!(m(json!("=5"), json!(5)));
        assert!(m(json!("= 5 "), json!(" 5.0")));
    }

    #[test]
    fn test_numeric_comparison_is_guarded() {
        assert!(!m(json!("<5"), json!("unavailable")));
        assert!(!m(json!("<abc"), json!("3")));
        assert!(!m(json!("!5"), json!("unknown")));
        assert!(!m(json!("<5"), json!(null)));
        assert!(!m(json!("<5"), json!([1])));
    }

    #[test]
    fn test_booleans_compare_as_integers() {
        assert!(m(json!("=1"), json!(true)));
        assert!(m(json!("=0"), json!(false)));
        assert!(m(json!(">0"), json!(true)));
        assert!(!m(json!("<1"), json!(true)));
        assert!(m(json!("!1"), json!(false)));
        assert!(m(json!(1), json!(true)));
        assert!(m(json!(0.0), json!(false)));
        assert!(m(json!(true), json!(1)));
        assert!(!m(json!(2), json!(true)));
        // Strings stay strings
        assert!(!m(json!(true), json!("true")));
        assert!(!m(json!("1"), json!(true)));
    }

    #[test]
    fn test_regex_lookaround_and_backreferences() {
        assert!(m(json!("/^(?!.*battery).*$/"), json!("sensor.temperature")));
        assert!(!m(json!("/^(?!.*battery).*$/"), json!("sensor.phone_battery")));
        assert!(m(json!("/(?<=light\\.)desk/"), json!("light.desk")));
        assert!(!m(json!("/(?<=light\\.)desk/"), json!("switch.desk")));
        assert!(m(json!("/(a)\\1/"), json!("xaax")));
        assert!(!m(json!("/(a)\\1/"), json!("xabx")));
    }

    #[test]
    fn test_json_mode() {
        assert!(m(json!("$$[1, 2]"), json!([1, 2])));
        assert!(!m(json!("$$[1,2]"), json!([1, 2])));
        assert!(m(json!("$$\"on\""), json!("on")));
        assert!(m(json!("$$null"), json!(null)));
        assert!(m(json!("$$*\"b\"*"), json!(["a", "b"])));
        assert!(m(json!("$$/\"mode\": \"heat\"/"), json!({"mode": "heat", "t": 20})));
        assert!(m(json!("$$>3"), json!(4)));
    }

    #[test]
    fn test_json_text_layout() {
        assert_eq!(to_json_text(&json!([1, 2])), "[1, 2]");
        assert_eq!(to_json_text(&json!({"a": 1, "b": [true, null]})), "{\"a\": 1, \"b\": [true, null]}");
        assert_eq!(to_json_text(&json!([])), "[]");
        assert_eq!(to_json_text(&json!("café")), "\"caf\\u00e9\"");
        assert_eq!(to_json_text(&json!("\u{1F600}")), "\"\\ud83d\\ude00\"");
        assert_eq!(to_json_text(&json!(1.5)), "1.5");
    }

    #[test]
    fn test_pattern_keeps_raw() {
        let pattern = Pattern::new(json!("$$[1]"));
        assert_eq!(pattern.raw(), &json!("$$[1]"));
    }
}
