//! The recursive predicate AST.
//!
//! Nodes deserialize from the single-key-dict convention for free: serde's
//! default externally-tagged representation for an enum *is* `{"where": ...}`
//! / `{"and": [...]}`, so no custom `Deserialize` impl is needed to preserve
//! the on-the-wire shape existing callers already send.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::ident::Id;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateNode {
    Where(WhereCondition),
    And(Vec<PredicateNode>),
    Or(Vec<PredicateNode>),
    Not(Vec<PredicateNode>),
    Exists(Vec<PredicateNode>),
    /// `questionnaire` is an alias of `custom_method` — identical handling,
    /// kept only because existing callers' JSON still spells it that way.
    #[serde(alias = "questionnaire")]
    CustomMethod(CustomMethodInvocation),
}

impl PredicateNode {
    /// Short label for the node kind, used in log lines and error context —
    /// never the full subtree, which can be large or contain values a
    /// caller wouldn't want echoed at `debug` level.
    pub fn kind(&self) -> &'static str {
        match self {
            PredicateNode::Where(_) => "where",
            PredicateNode::And(_) => "and",
            PredicateNode::Or(_) => "or",
            PredicateNode::Not(_) => "not",
            PredicateNode::Exists(_) => "exists",
            PredicateNode::CustomMethod(_) => "custom_method",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFn {
    Min,
    Max,
    Count,
}

impl AggregateFn {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
            AggregateFn::Count => "COUNT",
        }
    }
}

/// A `where` leaf: a field, an operator, and the value(s) the operator
/// compares it against, plus the optional aggregate/subquery qualifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct WhereCondition {
    pub field: Id,
    pub operator: String,
    pub value: Value,
    #[serde(default)]
    pub secondary_value: Option<Value>,
    #[serde(default)]
    pub aggregate_lhs: Option<AggregateFn>,
    /// When set together with `alias`, `field` is resolved against that
    /// subquery's local field map instead of the global schema.
    #[serde(default)]
    pub subquery: Option<Id>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A caller-supplied value for one declared custom-method (or SQL-subquery)
/// template parameter. Wrapped in a struct, rather than a bare `Value`, so
/// future parameter metadata (e.g. an explicit override of the declared
/// type) has somewhere to go without another breaking wire change.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamValue {
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomMethodInvocation {
    pub template_id: Id,
    pub parameters: HashMap<String, ParamValue>,
}
