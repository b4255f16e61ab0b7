//! jsonql — compiles a declarative JSON predicate tree into a MySQL SELECT.
//!
//! A [`Compiler`] is built once from a [`schema::SchemaBundle`] describing
//! the caller's field mapping, join-path graph, custom-method and subquery
//! templates, and variable templates. Every downstream `compile` call is
//! then a pure function of that schema plus the per-call predicate tree: no
//! I/O, no global state, safe to run concurrently across any number of
//! requests sharing the same compiler.
//!
//! ```text
//! request (predicate tree + options)
//!   -> field resolution (table, column, type)
//!   -> join planning
//!   -> predicate evaluation -> WHERE fragment
//!   -> subquery composition -> LEFT JOIN ( ... )
//!   -> emission -> SELECT ... FROM ... WHERE ... [GROUP BY ... HAVING ...]
//! ```
//!
//! This crate never executes the SQL it produces, never talks to a
//! database, and never re-parses its own output.
//!
//! # Safety note on `additional_where_clause`
//!
//! [`request::CompileOptions::additional_where_clause`] is appended
//! verbatim to the end of the emitted `WHERE` fragment. It is not
//! validated, escaped, or parsed — it exists because some callers have
//! legacy filter fragments outside this compiler's predicate-tree shape.
//! Passing caller-facing text through it defeats every injection guarantee
//! the rest of this crate provides. Treat it the same as any other
//! hand-assembled SQL string.

pub mod compiler;
pub mod emit;
pub mod error;
pub mod ident;
pub mod join;
pub mod predicate;
pub mod request;
pub mod schema;
pub mod subquery;
pub mod template;
pub mod value;

pub use compiler::Compiler;
pub use error::{CompileError, CompileResult, SchemaError, SchemaResult};
pub use request::{CompileOptions, CompileRequest, SelectField, SubqueryUsage};
pub use schema::SchemaBundle;
