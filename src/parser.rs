//! Query to diagram pipeline.

use crate::diagram::{DiagramBuilder, DiagramData};
use crate::sql::{CteDefinition, extract_ctes, extract_main_query, extract_tables, normalize_query};

/// Build the diagram for a SQL query.
///
/// Never fails: text that the heuristics do not recognise simply yields
/// fewer nodes. Every call starts from an empty accumulator, so the output
/// depends on nothing but `sql_query`.
pub fn parse_query(sql_query: &str) -> DiagramData {
    let query = normalize_query(sql_query);
    let ctes = extract_ctes(&query);
    let main_query = extract_main_query(&query);

    let mut builder = DiagramBuilder::new();
    let ctes = register_ctes(&mut builder, ctes);

    for cte in &ctes {
        let tables = extract_tables(&cte.query, builder.cte_names());
        builder.add_cte_node(&cte.name, tables);
    }

    let tables = extract_tables(&main_query, builder.cte_names());
    builder.add_table_nodes(&tables);
    builder.add_result_node();
    builder.add_relationships();
    builder.remove_cte_duplicates();

    let diagram = builder.finish();
    tracing::debug!(
        ctes = ctes.len(),
        tables = tables.len(),
        nodes = diagram.nodes.len(),
        edges = diagram.edges.len(),
        "built diagram"
    );
    diagram
}

/// Keep the first definition of every CTE name so node ids stay unique.
fn register_ctes(builder: &mut DiagramBuilder, ctes: Vec<CteDefinition>) -> Vec<CteDefinition> {
    ctes.into_iter()
        .filter(|cte| {
            let fresh = builder.register_cte(&cte.name);
            if !fresh {
                tracing::warn!(name = %cte.name, "duplicate CTE name, keeping first definition");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{CTE_EDGE_LABEL, NodeKind, RESULT_ID, TABLE_EDGE_LABEL};
    use pretty_assertions::assert_eq;

    fn labels(diagram: &DiagramData, kind: NodeKind) -> Vec<&str> {
        diagram.nodes_of(kind).map(|n| n.label.as_str()).collect()
    }

    fn assert_wired(diagram: &DiagramData) {
        assert_eq!(diagram.nodes_of(NodeKind::Result).count(), 1);
        for edge in &diagram.edges {
            assert!(diagram.node(&edge.from).is_some(), "dangling from {}", edge.from);
            assert!(diagram.node(&edge.to).is_some(), "dangling to {}", edge.to);
        }
        for node in &diagram.nodes {
            let expected = match node.kind {
                NodeKind::Table => TABLE_EDGE_LABEL,
                NodeKind::Cte => CTE_EDGE_LABEL,
                NodeKind::Result => continue,
            };
            let outgoing: Vec<_> = diagram.edges.iter().filter(|e| e.from == node.id).collect();
            assert_eq!(outgoing.len(), 1, "edges from {}", node.id);
            assert_eq!(outgoing[0].to, RESULT_ID);
            assert_eq!(outgoing[0].label, expected);
        }
    }

    #[test]
    fn test_plain_join() {
        let diagram = parse_query("SELECT * FROM employees e JOIN departments d ON e.dept_id = d.id");

        assert_eq!(labels(&diagram, NodeKind::Table), vec!["departments", "employees"]);
        assert!(labels(&diagram, NodeKind::Cte).is_empty());
        assert_wired(&diagram);
    }

    #[test]
    fn test_cte_not_reported_as_table() {
        let diagram = parse_query(
            "WITH dept_count AS (SELECT dept_id, COUNT(*) FROM employees GROUP BY dept_id) SELECT * FROM dept_count",
        );

        assert_eq!(labels(&diagram, NodeKind::Cte), vec!["dept_count"]);
        assert_eq!(labels(&diagram, NodeKind::Table), vec!["employees"]);
        assert_wired(&diagram);
    }

    #[test]
    fn test_cte_tables_recorded() {
        let diagram = parse_query(
            "WITH recent AS (SELECT * FROM orders WHERE created_at > now), \
             big AS (SELECT * FROM recent r JOIN customers c ON r.customer_id = c.id) \
             SELECT * FROM big",
        );

        let recent = diagram.node("cte_recent").unwrap();
        assert_eq!(recent.tables, Some(vec!["orders".to_string()]));

        let big = diagram.node("cte_big").unwrap();
        assert_eq!(big.tables, Some(vec!["customers".to_string()]));
        assert_eq!((big.x, big.y), (300, 250));
        assert_wired(&diagram);
    }

    #[test]
    fn test_duplicate_cte_names_merged() {
        let diagram = parse_query("WITH a AS (SELECT * FROM x), a AS (SELECT * FROM y) SELECT * FROM a");

        let ctes: Vec<_> = diagram.nodes_of(NodeKind::Cte).collect();
        assert_eq!(ctes.len(), 1);
        assert_eq!(ctes[0].tables, Some(vec!["x".to_string()]));
        assert_wired(&diagram);
    }

    #[test]
    fn test_comments_do_not_change_output() {
        let plain = "SELECT o.id FROM orders o JOIN users u ON o.user_id = u.id";
        let commented = "-- latest orders\nSELECT o.id /* primary key */\nFROM orders o -- fact\nJOIN users u ON o.user_id = u.id";

        assert_eq!(parse_query(plain), parse_query(commented));
    }

    #[test]
    fn test_idempotent() {
        let sql = "WITH a AS (SELECT * FROM x) SELECT * FROM a JOIN y ON a.id = y.id";
        let first = serde_json::to_string(&parse_query(sql)).unwrap();
        let second = serde_json::to_string(&parse_query(sql)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unrecognised_input_still_has_result() {
        for sql in ["", "not sql at all", "WITH", "((((", "DELETE FROM logs WHERE id = 1"] {
            let diagram = parse_query(sql);
            assert_eq!(diagram.nodes_of(NodeKind::Result).count(), 1, "{}", sql);
            assert_wired(&diagram);
        }
    }
}
