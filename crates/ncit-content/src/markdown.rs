use std::sync::LazyLock;

use regex::Regex;

/// Substitutions applied in order. Block-level patterns run before inline ones
/// so that e.g. a `* ` bullet is not mistaken for emphasis.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // fenced code blocks are dropped entirely
        (r"(?s)```.*?```", " "),
        (r"`([^`]*)`", "${1}"),
        (r"!\[[^\]]*\]\([^)]*\)", " "),
        (r"\[([^\]]*)\]\([^)]*\)", "${1}"),
        (r"<[^>]+>", " "),
        (r"(?m)^[ \t]{0,3}#{1,6}[ \t]*", ""),
        (r"(?m)^[ \t]*>[ \t]?", ""),
        (r"(?m)^[ \t]*([-*_][ \t]*){3,}$", " "),
        (r"(?m)^[ \t]*[-*+][ \t]+", ""),
        (r"(?m)^[ \t]*\d+\.[ \t]+", ""),
        (r"\*\*(.+?)\*\*", "${1}"),
        (r"\b__(.+?)__\b", "${1}"),
        (r"\*(.+?)\*", "${1}"),
        (r"\b_([^_]+?)_\b", "${1}"),
        (r"~~(.+?)~~", "${1}"),
        (r"\s+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        // all patterns are literals
        (Regex::new(pattern).expect("invalid markdown pattern"), replacement)
    })
    .collect()
});

/// Reduce markdown to plain text suitable for previews and search.
pub fn strip_markdown(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out.trim().to_string()
}
