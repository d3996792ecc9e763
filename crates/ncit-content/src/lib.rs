//! Text helpers for user-authored content: markdown stripping, excerpts,
//! reading time and tag cleanup. Pure functions, no I/O.

pub mod excerpt;
pub mod markdown;

pub use excerpt::{DEFAULT_EXCERPT_LEN, generate_excerpt, normalize_tags, reading_time_minutes};
pub use markdown::strip_markdown;
