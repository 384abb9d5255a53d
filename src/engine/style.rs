// src/engine/style.rs

use std::sync::OnceLock;

use regex::{NoExpand, Regex};

/// Placeholder a preset prompt may use to position the custom style
/// text. Matched case-insensitively.
pub const STYLE_PLACEHOLDER: &str = "{{AI_STYLE}}";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\{\{AI_STYLE\}\}").unwrap())
}

fn newline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Merges a named preset prompt and a free-form custom prompt into one
/// instruction string.
///
/// The custom prompt substitutes at every placeholder occurrence when
/// the base contains one, otherwise it is appended after a blank line.
/// Runs of 3+ newlines collapse to exactly 2 and the result is trimmed;
/// None means there is nothing to instruct.
pub fn compose(base_prompt: Option<&str>, style_prompt: Option<&str>) -> Option<String> {
    let base = base_prompt.map(str::trim).unwrap_or("");
    let style = style_prompt.map(str::trim).unwrap_or("");

    let merged = if base.is_empty() {
        style.to_string()
    } else if placeholder_re().is_match(base) {
        placeholder_re().replace_all(base, NoExpand(style)).into_owned()
    } else if !style.is_empty() {
        format!("{base}\n\n{style}")
    } else {
        base.to_string()
    };

    let collapsed = newline_re().replace_all(&merged, "\n\n");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
