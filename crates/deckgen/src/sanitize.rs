//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Prompts may carry private material and output paths reveal the user's
//! home layout, so spans only ever see a bounded excerpt or a file name.

use std::path::Path;

/// Longest prompt excerpt placed in a span, in characters.
pub const PREVIEW_CHARS: usize = 60;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Single-line excerpt of `text`, at most [`PREVIEW_CHARS`] characters plus
/// an ellipsis when cut.
pub fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
