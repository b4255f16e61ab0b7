//! Join planner: reverse-BFS from referenced tables to `base_table`,
//! hint-guided tie-breaking on ambiguous paths, path merging, deterministic
//! emission order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{CompileError, CompileResult};
use crate::schema::path::PathGraph;
use crate::value::quote_identifier;

/// One emitted `LEFT JOIN`, fully resolved against the path graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJoin {
    pub join_table: String,
    pub join_column: String,
    pub parent_table: String,
    pub parent_column: String,
    pub active_flag_column: Option<String>,
}

impl PlannedJoin {
    pub fn render(&self) -> String {
        let join_table = quote_identifier(&self.join_table);
        let parent_table = quote_identifier(&self.parent_table);
        let on = format!(
            "{join_table}.{} = {parent_table}.{}",
            quote_identifier(&self.join_column),
            quote_identifier(&self.parent_column)
        );
        match &self.active_flag_column {
            Some(flag) => format!(
                "LEFT JOIN {join_table} ON ({on} AND {join_table}.{} = TRUE)",
                quote_identifier(flag)
            ),
            None => format!("LEFT JOIN {join_table} ON {on}"),
        }
    }
}

/// Plans the join subgraph needed to connect every table in `referenced` to
/// `base_table`, consulting `path_hints` to break ties.
///
/// Returns the joins in stable, depth-first emission order (sorted by
/// child-table name at every level), ready to be concatenated after `FROM`.
pub fn plan_joins(
    paths: &PathGraph,
    base_table: &str,
    referenced: &HashSet<String>,
    path_hints: &HashMap<String, String>,
) -> CompileResult<Vec<PlannedJoin>> {
    // parent_table -> { child_table -> edge }, built up as the reverse-BFS
    // resolves each referenced table's path back to base_table.
    let mut subset: BTreeMap<String, BTreeMap<String, PlannedJoin>> = BTreeMap::new();
    let mut resolved: HashSet<String> = HashSet::new();
    let mut worklist: Vec<String> = referenced.iter().cloned().collect();
    worklist.sort();

    while let Some(table) = worklist.pop() {
        if table == base_table || resolved.contains(&table) {
            continue;
        }
        resolved.insert(table.clone());

        let candidates = paths.candidates(&table).ok_or_else(|| CompileError::AmbiguousPath {
            table: table.clone(),
            reason: "no known join path to any parent table".to_string(),
        })?;
        if candidates.is_empty() {
            return Err(CompileError::AmbiguousPath {
                table: table.clone(),
                reason: "no known join path to any parent table".to_string(),
            });
        }

        let parent_table = if let Some(hinted) = path_hints.get(&table) {
            if !candidates.contains_key(hinted) {
                return Err(CompileError::AmbiguousPath {
                    table: table.clone(),
                    reason: format!("path hint `{hinted}` is not a candidate parent"),
                });
            }
            let relevant: HashSet<&str> = referenced
                .iter()
                .map(String::as_str)
                .chain(path_hints.values().map(String::as_str))
                .collect();
            let intersection: Vec<&str> = candidates
                .keys()
                .map(String::as_str)
                .filter(|c| relevant.contains(c))
                .collect();
            if intersection.len() != 1 {
                return Err(CompileError::AmbiguousPath {
                    table: table.clone(),
                    reason: format!(
                        "path hint `{hinted}` is ambiguous against auto-selection: {} candidates overlap referenced/hinted tables",
                        intersection.len()
                    ),
                });
            }
            hinted.clone()
        } else if candidates.len() == 1 {
            candidates.keys().next().expect("len == 1").clone()
        } else {
            return Err(CompileError::AmbiguousPath {
                table: table.clone(),
                reason: format!(
                    "{} candidate parents ({}) and no path hint supplied",
                    candidates.len(),
                    {
                        let mut names: Vec<&str> = candidates.keys().map(String::as_str).collect();
                        names.sort();
                        names.join(", ")
                    }
                ),
            });
        };

        let edge = paths
            .edge(&table, &parent_table)
            .expect("parent_table was chosen from this table's own candidate set");

        subset.entry(parent_table.clone()).or_default().insert(
            table.clone(),
            PlannedJoin {
                join_table: table.clone(),
                join_column: edge.join_column.clone(),
                parent_table: parent_table.clone(),
                parent_column: edge.parent_column.clone(),
                active_flag_column: edge.active_flag_column.clone(),
            },
        );

        if parent_table != base_table {
            worklist.push(parent_table);
        }
    }

    let mut out = Vec::new();
    emit_depth_first(base_table, &subset, &mut out);
    log::debug!("join planner emitted {} join(s) from base `{base_table}`", out.len());
    Ok(out)
}

fn emit_depth_first(
    parent: &str,
    subset: &BTreeMap<String, BTreeMap<String, PlannedJoin>>,
    out: &mut Vec<PlannedJoin>,
) {
    let Some(children) = subset.get(parent) else {
        return;
    };
    // BTreeMap already iterates in child-table-name order.
    for (child, join) in children {
        out.push(join.clone());
        emit_depth_first(child, subset, out);
    }
}
