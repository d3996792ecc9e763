use crate::markdown::strip_markdown;

pub const DEFAULT_EXCERPT_LEN: usize = 150;

const WORDS_PER_MINUTE: usize = 200;

/// Plain-text preview of markdown `content`, at most `max_len` characters
/// plus a trailing `...` when truncated. Cuts at the last word boundary at
/// or before `max_len` when one exists.
pub fn generate_excerpt(content: &str, max_len: usize) -> String {
    let plain = strip_markdown(content);
    if plain.chars().count() <= max_len {
        return plain;
    }

    let window: String = plain.chars().take(max_len).collect();
    let cut = if plain.chars().nth(max_len).is_some_and(char::is_whitespace) {
        window.as_str()
    } else {
        match window.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => &window[..idx],
            _ => window.as_str(),
        }
    };
    let cut = cut.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'));

    format!("{}...", cut)
}

pub fn reading_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Trim, lower-case and de-duplicate tags, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
