//! The compiler's public entry point: a cheap-to-clone value wrapping a
//! validated [`SchemaRegistry`], exposing the single `compile` operation.

use crate::emit::compile_request;
use crate::error::{CompileResult, SchemaError};
use crate::request::{CompileOptions, CompileRequest};
use crate::schema::{SchemaBundle, SchemaRegistry};

/// Compiles predicate-tree requests against one fixed, immutable schema.
///
/// Construction validates the whole [`SchemaBundle`] eagerly; once built, a
/// `Compiler` is `Clone` at the cost of one `Arc` bump and safe to share
/// across any number of concurrent compilations — each
/// `compile` call only ever touches its own local scratch state.
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: SchemaRegistry,
}

impl Compiler {
    /// Validates `bundle` and builds a compiler from it. Fails on the first
    /// schema-validation violation encountered.
    pub fn build(bundle: SchemaBundle) -> Result<Self, SchemaError> {
        Ok(Compiler {
            registry: SchemaRegistry::build(bundle)?,
        })
    }

    /// Compiles `request` into a single SQL `SELECT` statement against
    /// `base_table`. `options` carries the select list override, subquery
    /// alias bind parameters, and the verbatim `additional_where_clause`
    /// escape hatch.
    pub fn compile(
        &self,
        request: &CompileRequest,
        base_table: &str,
        options: &CompileOptions,
    ) -> CompileResult<String> {
        compile_request(&self.registry, request, base_table, options, 0)
    }

    /// Read access to the underlying registry, for callers that need to
    /// inspect schema shape (e.g. to build a UI) without going through
    /// `compile`.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}
