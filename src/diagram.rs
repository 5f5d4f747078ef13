//! Diagram data model and the per-query node/edge assembler.

use serde::{Deserialize, Serialize};

const CTE_COLUMN_X: i64 = 300;
const CTE_ROW_SPACING: i64 = 150;
const TABLE_COLUMN_X: i64 = 50;
const TABLE_ROW_SPACING: i64 = 120;
const FIRST_ROW_Y: i64 = 100;
const RESULT_POSITION: (i64, i64) = (600, 200);

pub const RESULT_ID: &str = "result";
pub const RESULT_LABEL: &str = "Result";
pub const TABLE_EDGE_LABEL: &str = "data flow";
pub const CTE_EDGE_LABEL: &str = "processed data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Cte,
    Table,
    Result,
}

impl NodeKind {
    pub fn color(self) -> &'static str {
        match self {
            Self::Cte => "#8B4513",
            Self::Table => "#228B22",
            Self::Result => "#FF6347",
        }
    }

    /// Deterministic node id for a label of this kind.
    pub fn node_id(self, label: &str) -> String {
        match self {
            Self::Cte => format!("cte_{}", label),
            Self::Table => format!("table_{}", label),
            Self::Result => RESULT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    /// Source tables of a CTE node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
    pub color: String,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
}

/// Nodes and edges handed to a renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl DiagramData {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }
}

/// Per-call accumulator that lays out nodes and wires them to the result.
///
/// Positions depend only on insertion order: CTEs stack in the middle
/// column, tables in the left column, the result sits alone on the right.
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    cte_names: Vec<String>,
}

impl DiagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cte_names(&self) -> &[String] {
        &self.cte_names
    }

    /// Register a CTE name. Returns false when the name was already known.
    pub fn register_cte(&mut self, name: &str) -> bool {
        if self.cte_names.iter().any(|n| n == name) {
            return false;
        }
        self.cte_names.push(name.to_string());
        true
    }

    pub fn add_cte_node(&mut self, name: &str, tables: Vec<String>) {
        let row = self.nodes_of(NodeKind::Cte) as i64;
        self.nodes.push(Node {
            id: NodeKind::Cte.node_id(name),
            kind: NodeKind::Cte,
            label: name.to_string(),
            tables: Some(tables),
            color: NodeKind::Cte.color().to_string(),
            x: CTE_COLUMN_X,
            y: FIRST_ROW_Y + row * CTE_ROW_SPACING,
        });
    }

    pub fn add_table_nodes(&mut self, tables: &[String]) {
        for (i, table) in tables.iter().enumerate() {
            self.nodes.push(Node {
                id: NodeKind::Table.node_id(table),
                kind: NodeKind::Table,
                label: table.clone(),
                tables: None,
                color: NodeKind::Table.color().to_string(),
                x: TABLE_COLUMN_X,
                y: FIRST_ROW_Y + i as i64 * TABLE_ROW_SPACING,
            });
        }
    }

    pub fn add_result_node(&mut self) {
        let (x, y) = RESULT_POSITION;
        self.nodes.push(Node {
            id: RESULT_ID.to_string(),
            kind: NodeKind::Result,
            label: RESULT_LABEL.to_string(),
            tables: None,
            color: NodeKind::Result.color().to_string(),
            x,
            y,
        });
    }

    /// Connect every table, then every CTE, to the result node.
    pub fn add_relationships(&mut self) {
        let Some(result) = self.nodes.iter().find(|n| n.kind == NodeKind::Result) else {
            return;
        };
        let result_id = result.id.clone();

        let sources = [
            (NodeKind::Table, TABLE_EDGE_LABEL),
            (NodeKind::Cte, CTE_EDGE_LABEL),
        ];
        for (kind, label) in sources {
            for node in self.nodes.iter().filter(|n| n.kind == kind) {
                self.edges.push(Edge {
                    from: node.id.clone(),
                    to: result_id.clone(),
                    label: label.to_string(),
                });
            }
        }
    }

    /// Drop table nodes that shadow a CTE, along with their edges.
    pub fn remove_cte_duplicates(&mut self) {
        let cte_names = &self.cte_names;
        self.nodes
            .retain(|n| !(n.kind == NodeKind::Table && cte_names.contains(&n.label)));

        let nodes = &self.nodes;
        self.edges
            .retain(|e| nodes.iter().any(|n| n.id == e.from) && nodes.iter().any(|n| n.id == e.to));
    }

    pub fn finish(self) -> DiagramData {
        DiagramData {
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    fn nodes_of(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }
}
