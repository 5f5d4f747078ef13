//! Comment stripping and whitespace folding.

use regex::Regex;
use std::sync::OnceLock;

fn line_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)--.*$").expect("valid regex"))
}

fn block_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Normalize a query to a single comment-free line.
///
/// Line comments are removed before block comments, so a `--` inside a
/// block comment still eats the rest of its line.
pub fn normalize_query(query: &str) -> String {
    let query = line_comment().replace_all(query, "");
    let query = block_comment().replace_all(&query, "");
    let query = whitespace_run().replace_all(&query, " ");
    query.trim().to_string()
}
