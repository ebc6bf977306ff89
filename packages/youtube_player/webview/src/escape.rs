//! JavaScript literal escaping for values embedded into evaluated scripts.

use std::fmt::Write as _;

use serde_json::Value;

/// Escapes `value` for use between the quotes of a JavaScript string literal.
///
/// The result is valid inside either single or double quotes, contains no
/// line terminators and no `<`, so it also cannot close an inline
/// `<script>` element.
#[must_use]
pub fn escape_js_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{8}' => escaped.push_str("\\b"),
            '\u{c}' => escaped.push_str("\\f"),
            // `\0` followed by a digit would read as a legacy octal escape
            '\0' if chars.peek().is_some_and(char::is_ascii_digit) => escaped.push_str("\\x00"),
            '\0' => escaped.push_str("\\0"),
            '<' | '\u{2028}' | '\u{2029}' => push_unicode_escape(&mut escaped, c),
            c if c.is_control() => push_unicode_escape(&mut escaped, c),
            c => escaped.push(c),
        }
    }

    escaped
}

fn push_unicode_escape(escaped: &mut String, c: char) {
    // control characters and the line separators all fit in one UTF-16 unit
    let _ = write!(escaped, "\\u{:04x}", u32::from(c));
}

/// Escapes and double-quotes `value`.
#[must_use]
pub fn quote_js_string(value: &str) -> String {
    format!("\"{}\"", escape_js_string(value))
}

/// Renders `value` as a JavaScript expression.
///
/// Numbers, booleans and `null` are forwarded as-is, strings are quoted, and
/// objects and arrays are embedded as `JSON.parse("<escaped json>")` so no
/// caller-provided key or value is ever parsed as code.
#[must_use]
pub fn js_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quote_js_string(text),
        Value::Array(_) | Value::Object(_) => {
            format!("JSON.parse({})", quote_js_string(&value.to_string()))
        }
    }
}
