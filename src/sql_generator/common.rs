//! Common utilities for dialect text generation

use serde_json::Value;

/// Bracketed property key: `["Name"]`, with JSON string escaping.
pub fn property_key(name: &str) -> String {
    format!("[{}]", Value::String(name.to_string()))
}

/// Compact JSON for a literal value (`"west"`, `3`, `[1,111]`).
pub fn literal(value: &Value) -> String {
    value.to_string()
}

/// Prefixes every line of `text` with `width` spaces.
pub fn indent_lines(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parenthesizes a rendered query block. One-line blocks stay inline;
/// longer ones open a new, indented line and close right after the last.
pub fn nest(block: &str, width: usize) -> String {
    if block.contains('\n') {
        format!("(\n{})", indent_lines(block, width))
    } else {
        format!("({})", block)
    }
}
