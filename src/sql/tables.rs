//! Table-name heuristics.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// First identifiers the alias pass never reports. Compared case-sensitively.
const ALIAS_KEYWORDS: [&str; 6] = ["SELECT", "FROM", "WHERE", "GROUP", "ORDER", "HAVING"];

fn from_or_join() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:FROM|JOIN)\s+(\w+(?:\.\w+)?)").expect("valid regex"))
}

fn subquery_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\(\s*SELECT.*?FROM\s+(\w+)").expect("valid regex"))
}

fn aliased_table() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\w+)\s+(\w+)(?:\s+ON|\s+WHERE|\s+GROUP|\s+ORDER|\s+HAVING|$)")
            .expect("valid regex")
    })
}

/// Find the table names referenced by a query fragment.
///
/// Runs three independent passes (FROM/JOIN targets, subquery sources and
/// `table alias` pairs), drops anything named like a CTE of the current
/// query and returns the distinct names in lexical order.
pub fn extract_tables(query: &str, cte_names: &[String]) -> Vec<String> {
    let mut tables: BTreeSet<String> = BTreeSet::new();

    tables.extend(first_group(from_or_join(), query));
    tables.extend(first_group(subquery_from(), query));
    tables.extend(
        first_group(aliased_table(), query).filter(|name| !ALIAS_KEYWORDS.contains(&name.as_str())),
    );

    tables.retain(|name| !cte_names.contains(name));

    tracing::trace!(count = tables.len(), "extracted tables");
    tables.into_iter().collect()
}

fn first_group<'a>(re: &'a Regex, query: &'a str) -> impl Iterator<Item = String> + 'a {
    re.captures_iter(query)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(query: &str) -> Vec<String> {
        extract_tables(query, &[])
    }

    #[test]
    fn test_from_and_join() {
        let found = tables("SELECT * FROM employees e JOIN departments d ON e.dept_id = d.id");
        assert_eq!(found, vec!["departments", "employees"]);
        for keyword in ALIAS_KEYWORDS {
            assert!(!found.iter().any(|t| t == keyword));
        }
    }

    #[test]
    fn test_schema_qualified_name() {
        let found = tables("SELECT id FROM sales.orders");
        assert!(found.contains(&"sales.orders".to_string()));
    }

    #[test]
    fn test_subquery_source() {
        let found = tables("SELECT * FROM (SELECT id FROM accounts) sub");
        assert!(found.contains(&"accounts".to_string()));
    }

    #[test]
    fn test_subquery_source_stops_at_dot() {
        // the subquery pass takes only the schema part of a dotted name
        let found = tables("SELECT * FROM (SELECT id FROM sales.orders) s");
        assert_eq!(found, vec!["sales", "sales.orders"]);
    }

    #[test]
    fn test_alias_before_where() {
        let found = tables("SELECT name FROM customers c WHERE c.active = 1");
        assert_eq!(found, vec!["customers"]);
    }

    #[test]
    fn test_uppercase_keyword_alias_is_filtered() {
        // "FROM users" at end of input matches the alias pass
        let found = tables("SELECT id FROM users");
        assert_eq!(found, vec!["users"]);
    }

    #[test]
    fn test_lowercase_keyword_alias_is_kept() {
        let found = tables("select id from users");
        assert_eq!(found, vec!["from", "users"]);
    }

    #[test]
    fn test_cte_names_removed() {
        let ctes = vec!["recent".to_string()];
        let found = extract_tables("SELECT * FROM recent r JOIN payments p ON r.id = p.id", &ctes);
        assert_eq!(found, vec!["payments"]);
    }

    #[test]
    fn test_alias_stop_words_match_prefixes() {
        // " orders" satisfies the ORDER lookahead, so "r" and "s" come out as tables
        let ctes = vec!["recent".to_string()];
        let found = extract_tables("SELECT * FROM recent r JOIN orders o ON r.id = o.id", &ctes);
        assert_eq!(found, vec!["orders", "r", "s"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let found = tables("SELECT * FROM users JOIN users ON 1 = 1");
        assert_eq!(found.iter().filter(|t| *t == "users").count(), 1);
    }

    #[test]
    fn test_no_tables() {
        assert!(tables("SELECT 1").is_empty());
        assert!(tables("").is_empty());
    }
}
