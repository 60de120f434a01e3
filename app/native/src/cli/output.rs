//! Cell formatting for window tables and the colored JSON printer behind
//! `--json`.

use std::fmt::Write as _;

use colored::Colorize;
use serde_json::Value;

use crate::region::Rect;
use crate::topwin::Layer;

const INDENT: &str = "  ";

/// Print a report as indented JSON with keys, strings, numbers and
/// literals in distinct colors.
pub fn print_highlighted_json(value: &Value) { println!("{}", highlight_json(value)); }

/// Render `value` the way [`print_highlighted_json`] prints it.
#[must_use]
pub fn highlight_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().magenta().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().yellow().to_string()),
        Value::String(s) => out.push_str(&quoted(s).green().to_string()),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            out.push_str(&"[".bold().to_string());
            for (i, item) in items.iter().enumerate() {
                separator(out, i, depth + 1);
                write_value(out, item, depth + 1);
            }
            newline(out, depth);
            out.push_str(&"]".bold().to_string());
        }
        Value::Object(map) => {
            out.push_str(&"{".bold().to_string());
            for (i, (key, item)) in map.iter().enumerate() {
                separator(out, i, depth + 1);
                let _ = write!(out, "{}: ", quoted(key).cyan());
                write_value(out, item, depth + 1);
            }
            newline(out, depth);
            out.push_str(&"}".bold().to_string());
        }
    }
}

fn separator(out: &mut String, index: usize, depth: usize) {
    if index > 0 {
        out.push(',');
    }
    newline(out, depth);
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn quoted(s: &str) -> String { serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\"")) }

/// Shorten `s` to at most `max_chars` characters, ending in an ellipsis
/// when something was cut.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// A colored check mark or cross.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value { "✓".green().to_string() } else { "✗".red().to_string() }
}

/// A window id column that may be empty, such as a parent or z position.
#[must_use]
pub fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Summarize a clip region by its rectangle count and bounding box.
#[must_use]
pub fn format_clip(rects: usize, extents: Rect) -> String {
    match rects {
        0 => "hidden".dimmed().to_string(),
        1 => extents.to_string(),
        n => format!("{n} rects in {extents}"),
    }
}

#[must_use]
pub const fn layer_label(layer: Layer) -> &'static str {
    match layer {
        Layer::Top => "top",
        Layer::Normal => "normal",
        Layer::Bottom => "bottom",
    }
}
