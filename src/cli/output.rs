//! Output formatting for CLI

use crate::Pointer;
use serde_json::Value;

/// Render a value as JSON, pretty-printed unless `compact` is set.
pub fn format_json(value: &Value, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    rendered.unwrap_or_else(|_| "null".to_string())
}

/// One `pointer<TAB>value` line per leaf; values are shown as JSON.
pub fn format_leaves<'a>(leaves: impl IntoIterator<Item = (Pointer, &'a Value)>) -> String {
    let lines: Vec<String> = leaves
        .into_iter()
        .map(|(pointer, value)| {
            let shown = if pointer.is_root() {
                "\"\"".to_string()
            } else {
                pointer.to_string()
            };
            format!("{shown}\t{value}")
        })
        .collect();
    lines.join("\n")
}

/// Human-readable error report: the error followed by its root cause when
/// the two differ.
pub fn format_error(err: &crate::Error) -> String {
    let root = err.root_cause();
    if std::ptr::eq(root, err) {
        return format!("Error: {err}");
    }
    format!("Error: {err}\nCaused by: {root}")
}
