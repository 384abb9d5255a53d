// src/utils/html.rs

use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (<b>, <p>, lists) survive,
/// dangerous tags (<script>, <iframe>) and event-handler attributes are
/// stripped. Applied to imported question analysis and to AI-generated
/// explanations before they are stored or returned.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_html("<p>73 de K1ABC</p><script>alert(1)</script>");
        assert!(cleaned.contains("<p>73 de K1ABC</p>"));
        assert!(!cleaned.contains("script"));
    }
}
