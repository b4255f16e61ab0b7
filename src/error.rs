//! Error types for schema construction and compilation.
//!
//! One `thiserror` enum per subsystem rather than a single kitchen-sink
//! error: schema-validation failures (raised eagerly, once, at
//! construction) are kept separate from compile-time failures (raised per
//! `compile` call, against caller data).

use thiserror::Error;

/// Bound applied to JSON renderings of offending subtrees quoted in error
/// messages, so a pathological request can't turn an error message into an
/// unbounded allocation.
const SNIPPET_LIMIT: usize = 256;

pub(crate) fn snippet(value: &serde_json::Value) -> String {
    let rendered = serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string());
    if rendered.len() > SNIPPET_LIMIT {
        let mut truncated = rendered[..SNIPPET_LIMIT].to_string();
        truncated.push_str("...");
        truncated
    } else {
        rendered
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("duplicate field id `{0}`")]
    DuplicateFieldId(String),

    #[error("duplicate path edge for join table `{join_table}` -> parent `{parent_table}`")]
    DuplicatePathEdge {
        join_table: String,
        parent_table: String,
    },

    #[error("custom method `{id}` has an empty template")]
    EmptyTemplate { id: String },

    #[error("duplicate custom method id `{0}`")]
    DuplicateCustomMethodId(String),

    #[error(
        "custom method `{id}` parameter mismatch: declared {declared:?}, found placeholders {found:?}"
    )]
    CustomMethodParameterMismatch {
        id: String,
        declared: Vec<String>,
        found: Vec<String>,
    },

    #[error("duplicate subquery id `{0}`")]
    DuplicateSubqueryId(String),

    #[error("subquery `{id}` has an invalid body: {reason}")]
    InvalidSubqueryBody { id: String, reason: String },

    #[error(
        "subquery `{id}` parameter mismatch: declared {declared:?}, found placeholders {found:?}"
    )]
    SubqueryParameterMismatch {
        id: String,
        declared: Vec<String>,
        found: Vec<String>,
    },

    #[error("duplicate variable template id `{0}`")]
    DuplicateVariableTemplateId(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaError),

    #[error("unknown field id `{field_id}` (in: {context})")]
    UnknownField { field_id: String, context: String },

    #[error("unknown custom method template id `{template_id}` (in: {context})")]
    UnknownTemplate {
        template_id: String,
        context: String,
    },

    #[error("unknown subquery id `{subquery_id}` (in: {context})")]
    UnknownSubquery {
        subquery_id: String,
        context: String,
    },

    #[error("unknown variable template id `{variable_id}` (in: {context})")]
    UnknownVariable {
        variable_id: String,
        context: String,
    },

    #[error("missing required key `{key}` (in: {context})")]
    MissingKey { key: String, context: String },

    #[error("unexpected extra key `{key}` (in: {context})")]
    ExtraKey { key: String, context: String },

    #[error("bad value: {reason} (in: {context})")]
    BadValue { reason: String, context: String },

    #[error("ambiguous join path for table `{table}`: {reason}")]
    AmbiguousPath { table: String, reason: String },

    #[error("invalid aggregate usage: {reason} (in: {context})")]
    InvalidAggregate { reason: String, context: String },

    #[error("predicate tree too deep (limit {limit})")]
    RecursionLimitExceeded { limit: usize },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
pub type CompileResult<T> = Result<T, CompileError>;
