//! Emitter: assembles the top-level clauses — `SELECT … FROM …
//! [subquery joins] [path joins] WHERE … [GROUP BY … HAVING …]` — out of
//! the fragments the other sub-modules produce.

use std::collections::HashSet;

use crate::error::{CompileError, CompileResult};
use crate::ident::Id;
use crate::join::plan_joins;
use crate::predicate::evaluator::{compile_having, compile_predicate, EvalContext};
use crate::request::{CompileOptions, CompileRequest, SelectField};
use crate::schema::{FieldDescriptor, SchemaRegistry};
use crate::subquery::{compose_subqueries, CompileFn};
use crate::value::quote_identifier;

/// The literal field key meaning "the base table's own primary key",
/// recognised in `select_fields` and as a subquery's default join column
/// when no field is marked `is_member_id`.
const MEMBER_ID: &str = "member_id";

/// Compiles one predicate-tree request into a complete SQL `SELECT`
/// statement. `depth` tracks nested-subquery recursion — top-level callers
/// always start at `0`.
pub fn compile_request(
    registry: &SchemaRegistry,
    request: &CompileRequest,
    base_table: &str,
    options: &CompileOptions,
    depth: usize,
) -> CompileResult<String> {
    log::debug!(
        "compiling request: base_table=`{base_table}` depth={depth} fields={} subqueries={}",
        request.fields.len(),
        request.sub_queries.len()
    );

    let referenced_tables = collect_referenced_tables(registry, request, options)?;

    let path_joins = plan_joins(registry.paths(), base_table, &referenced_tables, &request.path_hints)?;

    let nested = |req: &CompileRequest, base: &str, opts: &CompileOptions, d: usize| {
        compile_request(registry, req, base, opts, d)
    };
    let compile_nested: &CompileFn<'_> = &nested;
    let composed_subqueries = compose_subqueries(
        registry,
        base_table,
        &request.sub_queries,
        &options.alias_params,
        depth,
        compile_nested,
    )?;

    let grouped_fields: HashSet<String> = request.group_by_fields.iter().map(Id::to_string).collect();

    let where_ctx = EvalContext::new(registry, &grouped_fields);
    let mut where_sql = compile_predicate(&where_ctx, &request.where_data)?;
    if let Some(extra) = &options.additional_where_clause {
        where_sql = format!("{where_sql} {extra}");
    }

    let mut group_by_segment = if request.group_by_fields.is_empty() {
        String::new()
    } else {
        let cols: CompileResult<Vec<String>> = request
            .group_by_fields
            .iter()
            .map(|id| resolve_qualified_column(registry, id, "group_by_fields"))
            .collect();
        format!("GROUP BY {}", cols?.join(", "))
    };

    if let Some(having) = &request.having {
        let having_sql = compile_having(&where_ctx, having)?;
        group_by_segment = if group_by_segment.is_empty() {
            format!("HAVING {having_sql}")
        } else {
            format!("{group_by_segment} HAVING {having_sql}")
        };
    }

    let select_segment = render_select(registry, base_table, &options.select_fields)?;

    let mut join_parts: Vec<String> = composed_subqueries.into_iter().map(|c| c.fragment).collect();
    join_parts.extend(path_joins.iter().map(|j| j.render()));
    let joins_segment = join_parts.join(" ");

    let sql = format!(
        "SELECT {select_segment} FROM {base_table} {joins_segment} WHERE {where_sql} {group_by_segment}"
    );
    log::trace!("compiled SQL: {sql}");
    Ok(sql)
}

fn collect_referenced_tables(
    registry: &SchemaRegistry,
    request: &CompileRequest,
    options: &CompileOptions,
) -> CompileResult<HashSet<String>> {
    let mut tables = HashSet::new();
    for id in &request.fields {
        tables.insert(lookup_field(registry, id, "request.fields")?.table.clone());
    }
    for id in &request.group_by_fields {
        tables.insert(lookup_field(registry, id, "group_by_fields")?.table.clone());
    }
    for select_field in &options.select_fields {
        if select_field.field.as_str() == MEMBER_ID {
            continue;
        }
        tables.insert(lookup_field(registry, &select_field.field, "select_fields")?.table.clone());
    }
    Ok(tables)
}

fn lookup_field<'a>(registry: &'a SchemaRegistry, id: &Id, context: &str) -> CompileResult<&'a FieldDescriptor> {
    registry.field(id).ok_or_else(|| CompileError::UnknownField {
        field_id: id.to_string(),
        context: context.to_string(),
    })
}

fn resolve_qualified_column(registry: &SchemaRegistry, id: &Id, context: &str) -> CompileResult<String> {
    let field = lookup_field(registry, id, context)?;
    Ok(format!(
        "{}.{}",
        quote_identifier(&field.table),
        quote_identifier(&field.column)
    ))
}

fn render_select(registry: &SchemaRegistry, base_table: &str, fields: &[SelectField]) -> CompileResult<String> {
    if fields.is_empty() {
        return Ok(format!(
            "COUNT(DISTINCT {}.{})",
            quote_identifier(base_table),
            quote_identifier("id")
        ));
    }

    let mut parts = Vec::with_capacity(fields.len());
    for select_field in fields {
        let column_ref = if select_field.field.as_str() == MEMBER_ID {
            format!("{}.{}", quote_identifier(base_table), quote_identifier("id"))
        } else {
            resolve_qualified_column(registry, &select_field.field, "select_fields")?
        };
        let column_ref = match select_field.aggregate {
            Some(agg) => format!("{}({column_ref})", agg.sql_name()),
            None => column_ref,
        };
        parts.push(format!("{column_ref} AS {}", quote_identifier(&select_field.alias)));
    }
    Ok(parts.join(", "))
}
