//! CLI output formatting for the `inspect` command.
//!
//! # Output Format
//!
//! ## Full metadata
//!
//! ```text
//! Image (4 fields)
//!     Make: Canon
//!     Model: Canon EOS 5D
//!     Orientation: 1
//!     XResolution: 72
//! GPSInfo (2 fields)
//!     GPSLatitude: [48.0, 51.0, 30.0]
//!     GPSLatitudeRef: N
//! ```
//!
//! ## Selected fields
//!
//! ```text
//! Make: Canon
//! ISO: 400
//! GPSInfo:
//!     GPSLatitude: [48.0, 51.0, 30.0]
//!     GPSLatitudeRef: N
//!
//! 3 of 4 selectors matched
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::metadata::Metadata;
use crate::selector::ExtractedData;
use serde_json::Value;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Render a scalar or array on one line. Strings print without quotes.
fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(inline_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 => format!("{f:.1}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Push `name: value`, expanding objects into an indented block.
fn push_entry(lines: &mut Vec<String>, depth: usize, name: &str, value: &Value) {
    match value {
        Value::Object(fields) => {
            lines.push(format!("{}{}:", indent(depth), name));
            for (key, inner) in fields {
                push_entry(lines, depth + 1, key, inner);
            }
        }
        other => lines.push(format!("{}{}: {}", indent(depth), name, inline_value(other))),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Full metadata
// ============================================================================

/// Format every decoded namespace as a two-level tree.
pub fn format_metadata(metadata: &Metadata) -> Vec<String> {
    if metadata.is_empty() {
        return vec!["No EXIF fields decoded".to_string()];
    }

    let mut lines = Vec::new();
    for (namespace, fields) in metadata.namespaces() {
        lines.push(format!("{} ({})", namespace, plural(fields.len(), "field")));
        for (name, value) in fields {
            push_entry(&mut lines, 1, name, value);
        }
    }
    lines
}

pub fn print_metadata(metadata: &Metadata) {
    for line in format_metadata(metadata) {
        println!("{line}");
    }
}

// ============================================================================
// Selected fields
// ============================================================================

/// Format selector results, one entry per key, followed by a match summary.
///
/// A key with several matches (a namespace-less selector hitting more than one
/// namespace) lists each match on its own indented line.
pub fn format_extracted(extracted: &ExtractedData, selector_count: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (key, values) in extracted {
        match values.as_slice() {
            [single] => push_entry(&mut lines, 0, key, single),
            many => {
                lines.push(format!("{key}: ({} matches)", many.len()));
                for value in many {
                    push_entry(&mut lines, 1, "-", value);
                }
            }
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} of {} matched",
        extracted.len(),
        plural(selector_count, "selector")
    ));
    lines
}

pub fn print_extracted(extracted: &ExtractedData, selector_count: usize) {
    for line in format_extracted(extracted, selector_count) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Namespace;
    use serde_json::json;

    fn sample_metadata() -> Metadata {
        let mut metadata = Metadata::default();
        metadata.insert(Namespace::Image, "Make", json!("Canon"));
        metadata.insert(Namespace::Image, "Orientation", json!(1));
        metadata.insert(Namespace::GpsInfo, "GPSLatitude", json!([48.0, 51.0, 30.5]));
        metadata
    }

    // =========================================================================
    // inline_value
    // =========================================================================

    #[test]
    fn inline_value_formats_scalars() {
        assert_eq!(inline_value(&json!("Canon")), "Canon");
        assert_eq!(inline_value(&json!(400)), "400");
        assert_eq!(inline_value(&json!(2.8)), "2.8");
        assert_eq!(inline_value(&json!(72.0)), "72.0");
        assert_eq!(inline_value(&Value::Null), "null");
    }

    #[test]
    fn inline_value_formats_arrays() {
        assert_eq!(inline_value(&json!([48.0, 51.0, 30.5])), "[48.0, 51.0, 30.5]");
        assert_eq!(inline_value(&json!(["a", "b"])), "[a, b]");
    }

    // =========================================================================
    // format_metadata
    // =========================================================================

    #[test]
    fn metadata_tree_groups_by_namespace() {
        let lines = format_metadata(&sample_metadata());
        assert_eq!(
            lines,
            vec![
                "Image (2 fields)",
                "    Make: Canon",
                "    Orientation: 1",
                "GPSInfo (1 field)",
                "    GPSLatitude: [48.0, 51.0, 30.5]",
            ]
        );
    }

    #[test]
    fn empty_metadata_says_so() {
        assert_eq!(
            format_metadata(&Metadata::default()),
            vec!["No EXIF fields decoded"]
        );
    }

    // =========================================================================
    // format_extracted
    // =========================================================================

    #[test]
    fn extracted_lists_single_matches_inline() {
        let mut extracted = ExtractedData::new();
        extracted.insert("Make".into(), vec![json!("Canon")]);
        extracted.insert("ISO".into(), vec![json!(400)]);

        let lines = format_extracted(&extracted, 3);
        assert_eq!(
            lines,
            vec!["ISO: 400", "Make: Canon", "", "2 of 3 selectors matched"]
        );
    }

    #[test]
    fn extracted_expands_objects_and_multiple_matches() {
        let mut extracted = ExtractedData::new();
        extracted.insert(
            "GPSInfo".into(),
            vec![json!({ "GPSLatitudeRef": "N", "GPSAltitude": 35.0 })],
        );
        extracted.insert("XResolution".into(), vec![json!(72.0), json!(300.0)]);

        let lines = format_extracted(&extracted, 2);
        assert_eq!(
            lines,
            vec![
                "GPSInfo:",
                "    GPSAltitude: 35.0",
                "    GPSLatitudeRef: N",
                "XResolution: (2 matches)",
                "    -: 72.0",
                "    -: 300.0",
                "",
                "2 of 2 selectors matched",
            ]
        );
    }

    #[test]
    fn extracted_with_no_matches_prints_summary_only() {
        let lines = format_extracted(&ExtractedData::new(), 1);
        assert_eq!(lines, vec!["0 of 1 selector matched"]);
    }
}
