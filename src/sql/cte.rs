//! WITH-clause extraction.
//!
//! Both extractors work on normalized text and never fail: anything that does
//! not look like `name AS ( ... )` is skipped. CTE bodies end at the first
//! closing parenthesis, so a body such as `SELECT COUNT(*) FROM t` comes back
//! truncated to `SELECT COUNT(*`.

use regex::Regex;
use std::sync::OnceLock;

/// One `name AS (body)` entry of a WITH clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CteDefinition {
    pub name: String,
    pub query: String,
}

fn with_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)WITH\s+").expect("valid regex"))
}

fn select_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)SELECT").expect("valid regex"))
}

fn cte_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i),\s*(\w+\s+AS\s*\()").expect("valid regex"))
}

fn cte_definition() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)(\w+)\s+AS\s*\(\s*(.*?)\s*\)").expect("valid regex"))
}

fn with_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)WITH\s+.*?\)\s*,?\s*").expect("valid regex"))
}

/// Extract the CTE definitions of a normalized query.
pub fn extract_ctes(query: &str) -> Vec<CteDefinition> {
    if !query.to_uppercase().contains("WITH") {
        return Vec::new();
    }

    let Some(clause) = with_clause(query) else {
        return Vec::new();
    };

    let ctes: Vec<CteDefinition> = split_definitions(clause)
        .into_iter()
        .filter_map(parse_definition)
        .collect();

    tracing::debug!(count = ctes.len(), "extracted CTE definitions");
    ctes
}

/// Strip the WITH block and return the trailing query.
pub fn extract_main_query(query: &str) -> String {
    with_block().replace_all(query, "").trim().to_string()
}

/// Text between `WITH` and the first SELECT outside any parentheses.
fn with_clause(query: &str) -> Option<&str> {
    let start = with_keyword().find(query)?.end();
    let rest = &query[start..];
    Some(&rest[..clause_end(rest)])
}

fn clause_end(rest: &str) -> usize {
    let mut depth = 0;
    let mut scanned = 0;
    for select in select_keyword().find_iter(rest) {
        depth = paren_depth(&rest[scanned..select.start()], depth);
        scanned = select.start();
        if depth == 0 {
            return select.start();
        }
    }
    rest.len()
}

fn paren_depth(text: &str, mut depth: usize) -> usize {
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Split on commas that start a new `name AS (` entry.
fn split_definitions(clause: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in cte_separator().captures_iter(clause) {
        let (Some(comma), Some(next)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        segments.push(&clause[last..comma.start()]);
        last = next.start();
    }
    segments.push(&clause[last..]);
    segments
}

fn parse_definition(segment: &str) -> Option<CteDefinition> {
    let caps = cte_definition().captures(segment)?;
    Some(CteDefinition {
        name: caps.get(1)?.as_str().to_string(),
        query: caps.get(2)?.as_str().to_string(),
    })
}
