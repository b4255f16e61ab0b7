//! The per-call compile input: the predicate tree plus the surrounding
//! request shape (fields, group-by, having, path hints, subquery usages) and
//! the options that don't round-trip through the predicate tree itself
//! (select list, alias parameters, the verbatim escape hatch).

use std::collections::HashMap;

use serde::Deserialize;

use crate::ident::Id;
use crate::predicate::ast::{AggregateFn, ParamValue, PredicateNode};

/// How the request uses one of the registry's subqueries: which descriptor
/// to splice in, and the parameters to bind if it's a raw-SQL subquery.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SubqueryUsage {
    pub subquery_id: Id,
    #[serde(default)]
    pub parameters: HashMap<String, ParamValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompileRequest {
    /// Every table referenced by this request, via resolved field ids —
    /// drives join planning.
    pub fields: Vec<Id>,
    pub where_data: PredicateNode,
    #[serde(default)]
    pub group_by_fields: Vec<Id>,
    #[serde(default)]
    pub having: Option<PredicateNode>,
    /// `join_table -> chosen parent_table`, consulted by the join planner
    /// when a table has more than one candidate parent.
    #[serde(default)]
    pub path_hints: HashMap<String, String>,
    /// `alias -> usage`, one entry per subquery spliced into this query via
    /// `LEFT JOIN (...) AS alias`.
    #[serde(default)]
    pub sub_queries: HashMap<String, SubqueryUsage>,
}

#[derive(Debug, Clone)]
pub struct SelectField {
    pub field: Id,
    pub alias: String,
    pub aggregate: Option<AggregateFn>,
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Overrides the default `COUNT(DISTINCT base.id)` select list.
    pub select_fields: Vec<SelectField>,
    /// Extra bind parameters for subquery aliases, merged with whatever the
    /// request's own `sub_queries` entries declare.
    pub alias_params: HashMap<String, HashMap<String, ParamValue>>,
    /// Appended verbatim to the end of the `WHERE` fragment. Not validated,
    /// not escaped — see the safety note on [`CompileOptions`] in the crate
    /// docs; this is an escape hatch whose contract is the caller's to keep.
    pub additional_where_clause: Option<String>,
}
