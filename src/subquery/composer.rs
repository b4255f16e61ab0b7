//! Subquery composer: splices derived tables into the enclosing
//! query via `LEFT JOIN ( <inner> ) AS <alias> ON <alias>.<join_col> =
//! <base_table>.id`, either binding a raw-SQL template or compiling a
//! nested predicate request by recursive invocation of the top-level
//! compiler.

use std::collections::HashMap;

use crate::error::{CompileError, CompileResult};
use crate::predicate::ast::ParamValue;
use crate::request::{CompileOptions, SelectField, SubqueryUsage};
use crate::schema::{SchemaRegistry, SubqueryBody, SubqueryDescriptor};
use crate::template::bind_template;
use crate::value::quote_identifier;

/// Recursive-invocation depth a nested-predicate subquery tolerates, tracked
/// separately from the predicate-tree recursion counter: a subquery's body
/// may itself reference subqueries, and the schema registry does not reject
/// cycles among subquery ids at construction since a subquery's nested
/// predicate is caller data, not a static table the registry can fully walk
/// up front.
pub const MAX_SUBQUERY_DEPTH: usize = 8;

/// Signature of the top-level recursive compiler entry point, injected by
/// the emitter to avoid a module cycle between `emit` and `subquery`.
pub type CompileFn<'a> = dyn Fn(&crate::request::CompileRequest, &str, &CompileOptions, usize) -> CompileResult<String>
    + 'a;

/// One spliced subquery join, already rendered.
pub struct ComposedSubquery {
    pub alias: String,
    pub fragment: String,
}

pub fn compose_subqueries(
    registry: &SchemaRegistry,
    base_table: &str,
    usages: &HashMap<String, SubqueryUsage>,
    alias_params: &HashMap<String, HashMap<String, ParamValue>>,
    depth: usize,
    compile_nested: &CompileFn<'_>,
) -> CompileResult<Vec<ComposedSubquery>> {
    if depth > MAX_SUBQUERY_DEPTH {
        return Err(CompileError::RecursionLimitExceeded {
            limit: MAX_SUBQUERY_DEPTH,
        });
    }

    let mut aliases: Vec<&String> = usages.keys().collect();
    aliases.sort();

    let mut out = Vec::with_capacity(aliases.len());
    for alias in aliases {
        let usage = &usages[alias];
        let context = format!("subquery alias `{alias}`");
        let descriptor = registry.subquery(&usage.subquery_id).ok_or_else(|| CompileError::UnknownSubquery {
            subquery_id: usage.subquery_id.to_string(),
            context: context.clone(),
        })?;

        let join_column = member_id_join_column(descriptor);

        let mut merged = alias_params.get(alias).cloned().unwrap_or_default();
        merged.extend(usage.parameters.clone());

        let inner_sql = match &descriptor.body {
            SubqueryBody::Sql(template) => {
                bind_template(registry, template, &descriptor.parameters, &merged, &context)?
            }
            SubqueryBody::Predicate(nested_request) => {
                let mut field_keys: Vec<&String> = descriptor.fields.keys().collect();
                field_keys.sort();
                let select_fields = field_keys
                    .into_iter()
                    .map(|field_key| SelectField {
                        field: field_key.as_str().into(),
                        alias: descriptor.fields[field_key].alias.clone(),
                        aggregate: None,
                    })
                    .collect();
                let nested_options = CompileOptions {
                    select_fields,
                    alias_params: HashMap::new(),
                    additional_where_clause: None,
                };
                compile_nested(nested_request, base_table, &nested_options, depth + 1)?
            }
        };

        let alias_ident = quote_identifier(alias);
        let base_ident = quote_identifier(base_table);
        let fragment = format!(
            "LEFT JOIN ( {inner_sql} ) AS {alias_ident} ON {alias_ident}.{} = {base_ident}.{}",
            quote_identifier(&join_column),
            quote_identifier("id"),
        );
        log::debug!("composed subquery alias=`{alias}` id=`{}`", usage.subquery_id);
        out.push(ComposedSubquery {
            alias: alias.clone(),
            fragment,
        });
    }

    Ok(out)
}

/// Resolves the column the composer joins the derived table's rows on: a
/// field marked `is_member_id` names it via its `alias`; absent that, the
/// literal `member_id`.
fn member_id_join_column(descriptor: &SubqueryDescriptor) -> String {
    descriptor
        .fields
        .values()
        .find(|f| f.is_member_id)
        .map(|f| f.alias.clone())
        .unwrap_or_else(|| "member_id".to_string())
}
