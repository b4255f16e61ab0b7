use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A directed edge `join_table -> parent_table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEdge {
    pub join_table: String,
    pub parent_table: String,
    pub join_column: String,
    pub parent_column: String,
    #[serde(default)]
    pub active_flag_column: Option<String>,
}

/// `join_table -> { parent_table -> edge }`. Built once at construction and
/// never mutated afterwards; the join planner only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    edges: HashMap<String, HashMap<String, PathEdge>>,
}

impl PathGraph {
    pub fn candidates(&self, join_table: &str) -> Option<&HashMap<String, PathEdge>> {
        self.edges.get(join_table)
    }

    pub fn edge(&self, join_table: &str, parent_table: &str) -> Option<&PathEdge> {
        self.edges.get(join_table).and_then(|m| m.get(parent_table))
    }

    pub(crate) fn builder() -> PathGraphBuilder {
        PathGraphBuilder::default()
    }
}

#[derive(Default)]
pub(crate) struct PathGraphBuilder {
    edges: HashMap<String, HashMap<String, PathEdge>>,
}

impl PathGraphBuilder {
    /// Inserts an edge, rejecting a repeated `(join_table, parent_table)` pair.
    pub fn insert(&mut self, edge: PathEdge) -> Result<(), crate::error::SchemaError> {
        let parents = self.edges.entry(edge.join_table.clone()).or_default();
        if parents.contains_key(&edge.parent_table) {
            return Err(crate::error::SchemaError::DuplicatePathEdge {
                join_table: edge.join_table,
                parent_table: edge.parent_table,
            });
        }
        parents.insert(edge.parent_table.clone(), edge);
        Ok(())
    }

    pub fn build(self) -> PathGraph {
        PathGraph { edges: self.edges }
    }
}
