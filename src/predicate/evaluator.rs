//! Predicate evaluator: recursively converts the condition AST into
//! SQL fragments.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{snippet, CompileError, CompileResult};
use crate::ident::Id;
use crate::predicate::ast::{CustomMethodInvocation, PredicateNode, WhereCondition};
use crate::predicate::operator::OperatorKind;
use crate::schema::{DataType, SchemaRegistry};
use crate::template::bind_custom_method;
use crate::value::renderer::scalar_to_string;
use crate::value::{quote_identifier, quote_string, render_value};

/// Predicate-tree recursion depth the evaluator tolerates before failing
/// with [`CompileError::RecursionLimitExceeded`] instead of overflowing the
/// stack on a pathological input.
const MAX_PREDICATE_DEPTH: usize = 64;

/// Threading context for one `compile` call's recursive descent. `in_having`
/// and `grouped_fields` implement the aggregate-usage validation without the
/// evaluator needing to know about the emitter's other responsibilities.
pub struct EvalContext<'a> {
    pub registry: &'a SchemaRegistry,
    pub in_having: bool,
    pub grouped_fields: &'a HashSet<String>,
    depth: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(registry: &'a SchemaRegistry, grouped_fields: &'a HashSet<String>) -> Self {
        EvalContext {
            registry,
            in_having: false,
            grouped_fields,
            depth: 0,
        }
    }

    fn for_having(&self) -> EvalContext<'a> {
        EvalContext {
            registry: self.registry,
            in_having: true,
            grouped_fields: self.grouped_fields,
            depth: self.depth,
        }
    }

    fn descend(&self) -> CompileResult<EvalContext<'a>> {
        let depth = self.depth + 1;
        if depth > MAX_PREDICATE_DEPTH {
            return Err(CompileError::RecursionLimitExceeded {
                limit: MAX_PREDICATE_DEPTH,
            });
        }
        Ok(EvalContext {
            registry: self.registry,
            in_having: self.in_having,
            grouped_fields: self.grouped_fields,
            depth,
        })
    }
}

pub fn compile_predicate(ctx: &EvalContext, node: &PredicateNode) -> CompileResult<String> {
    let ctx = &ctx.descend()?;
    log::debug!("compiling predicate node kind={}", node.kind());
    match node {
        PredicateNode::Where(cond) => compile_where_leaf(ctx, cond),
        PredicateNode::And(children) => compile_bool_fold(ctx, children, "and"),
        PredicateNode::Or(children) => compile_bool_fold(ctx, children, "or"),
        PredicateNode::Not(children) => compile_unary(ctx, children, "not"),
        PredicateNode::Exists(_) => Err(CompileError::BadValue {
            reason: "the `exists` node has no defined semantics in this compiler".to_string(),
            context: "exists".to_string(),
        }),
        PredicateNode::CustomMethod(invocation) => compile_custom_method(ctx, invocation),
    }
}

/// Entry point for compiling a `having` clause: every leaf must reference a
/// grouped field or carry an `aggregate_lhs`.
pub fn compile_having(ctx: &EvalContext, node: &PredicateNode) -> CompileResult<String> {
    compile_predicate(&ctx.for_having(), node)
}

fn compile_bool_fold(ctx: &EvalContext, children: &[PredicateNode], joiner: &str) -> CompileResult<String> {
    if children.is_empty() {
        return Err(CompileError::MissingKey {
            key: joiner.to_string(),
            context: format!("`{joiner}` requires at least one child"),
        });
    }
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        parts.push(format!("({})", compile_predicate(ctx, child)?));
    }
    Ok(format!("({})", parts.join(&format!(" {joiner} "))))
}

fn compile_unary(ctx: &EvalContext, children: &[PredicateNode], keyword: &str) -> CompileResult<String> {
    if children.len() != 1 {
        return Err(CompileError::BadValue {
            reason: format!("`{keyword}` requires exactly one child, found {}", children.len()),
            context: keyword.to_string(),
        });
    }
    let inner = compile_predicate(ctx, &children[0])?;
    Ok(format!("{keyword} ({inner})"))
}

fn compile_custom_method(ctx: &EvalContext, invocation: &CustomMethodInvocation) -> CompileResult<String> {
    let context = format!("custom_method `{}`", invocation.template_id);
    let method = ctx
        .registry
        .custom_method(&invocation.template_id)
        .ok_or_else(|| CompileError::UnknownTemplate {
            template_id: invocation.template_id.to_string(),
            context: context.clone(),
        })?;
    bind_custom_method(ctx.registry, method, &invocation.parameters, &context)
}

fn compile_where_leaf(ctx: &EvalContext, cond: &WhereCondition) -> CompileResult<String> {
    let context = describe_where(cond);

    if cond.aggregate_lhs.is_some() && !ctx.in_having {
        return Err(CompileError::InvalidAggregate {
            reason: "aggregate_lhs is only permitted inside a having clause".to_string(),
            context,
        });
    }

    let (column_ref, data_type) = resolve_field(ctx.registry, cond, &context)?;

    let column_ref = if let Some(agg) = cond.aggregate_lhs {
        format!("{}({column_ref})", agg.sql_name())
    } else {
        if ctx.in_having {
            let field_key = cond.field.to_string();
            if !ctx.grouped_fields.contains(&field_key) {
                return Err(CompileError::InvalidAggregate {
                    reason: format!(
                        "field `{field_key}` is neither in group_by_fields nor aggregated"
                    ),
                    context,
                });
            }
        }
        column_ref
    };

    let op = OperatorKind::parse(&cond.operator, &context)?;

    match op {
        OperatorKind::Between => compile_between(ctx.registry, &column_ref, data_type, cond, &context),
        OperatorKind::IsOp => compile_is_op(&column_ref, data_type, &cond.value, &context),
        OperatorKind::Like | OperatorKind::StartsWith | OperatorKind::EndsWith | OperatorKind::HasSubstring => {
            compile_like(op, &column_ref, &cond.value, &context)
        }
        OperatorKind::IsChallengeCompleted | OperatorKind::IsChallengeNotCompleted => {
            compile_challenge(ctx.registry, op, &cond.value, &context)
        }
        OperatorKind::IsPresent => compile_is_present(&column_ref, &cond.value, &context),
        OperatorKind::InOp => compile_in(ctx.registry, &column_ref, data_type, &cond.value, &context),
        _ => {
            let token = op
                .token()
                .expect("remaining operator variants all have a plain SQL token");
            let rendered = render_value(ctx.registry, data_type, &cond.value, &context)?;
            Ok(format!("{column_ref} {token} {rendered}"))
        }
    }
}

fn resolve_field(
    registry: &SchemaRegistry,
    cond: &WhereCondition,
    context: &str,
) -> CompileResult<(String, DataType)> {
    if let Some(subquery_id) = &cond.subquery {
        let subquery = registry
            .subquery(subquery_id)
            .ok_or_else(|| CompileError::UnknownSubquery {
                subquery_id: subquery_id.to_string(),
                context: context.to_string(),
            })?;
        let local_key = cond.field.as_str();
        let field = subquery.fields.get(local_key).ok_or_else(|| CompileError::UnknownField {
            field_id: cond.field.to_string(),
            context: context.to_string(),
        })?;
        let alias = cond.alias.as_deref().unwrap_or(subquery_id.as_str());
        let column_ref = format!(
            "{}.{}",
            quote_identifier(alias),
            quote_identifier(&field.alias)
        );
        Ok((column_ref, field.data_type))
    } else {
        let field = registry.field(&cond.field).ok_or_else(|| CompileError::UnknownField {
            field_id: cond.field.to_string(),
            context: context.to_string(),
        })?;
        let column_ref = format!(
            "{}.{}",
            quote_identifier(&field.table),
            quote_identifier(&field.column)
        );
        Ok((column_ref, field.data_type))
    }
}

fn compile_between(
    registry: &SchemaRegistry,
    column_ref: &str,
    data_type: DataType,
    cond: &WhereCondition,
    context: &str,
) -> CompileResult<String> {
    let secondary = cond.secondary_value.as_ref().ok_or_else(|| CompileError::MissingKey {
        key: "secondary_value".to_string(),
        context: context.to_string(),
    })?;
    let lo = render_value(registry, data_type, &cond.value, context)?;
    let hi = render_value(registry, data_type, secondary, context)?;
    Ok(format!("{column_ref} between {lo} AND {hi}"))
}

fn compile_is_op(column_ref: &str, data_type: DataType, raw: &Value, context: &str) -> CompileResult<String> {
    let rhs = scalar_to_string(raw, context)?;
    let upper = rhs.trim().to_uppercase();
    if matches!(data_type, DataType::String) {
        match upper.as_str() {
            "EMPTY" => Ok(format!("{column_ref} = ''")),
            "NOT EMPTY" => Ok(format!("{column_ref} <> ''")),
            _ => Err(CompileError::BadValue {
                reason: format!("IS on a string field requires EMPTY or NOT EMPTY, found `{rhs}`"),
                context: context.to_string(),
            }),
        }
    } else {
        match upper.as_str() {
            "NULL" | "NOT NULL" | "TRUE" | "FALSE" => Ok(format!("{column_ref} IS {upper}")),
            _ => Err(CompileError::BadValue {
                reason: format!("IS requires NULL, NOT NULL, TRUE, or FALSE, found `{rhs}`"),
                context: context.to_string(),
            }),
        }
    }
}

fn compile_like(op: OperatorKind, column_ref: &str, raw: &Value, context: &str) -> CompileResult<String> {
    let plain = scalar_to_string(raw, context)?;
    let wildcarded = match op {
        OperatorKind::StartsWith => format!("{plain}%"),
        OperatorKind::EndsWith => format!("%{plain}"),
        OperatorKind::HasSubstring => format!("%{plain}%"),
        _ => plain,
    };
    Ok(format!("{column_ref} LIKE {}", quote_string(&wildcarded)))
}

const CHALLENGE_TABLE: &str = "journeys_memberstagechallenge";

fn compile_challenge(registry: &SchemaRegistry, op: OperatorKind, raw: &Value, context: &str) -> CompileResult<String> {
    let challenge_id = render_value(registry, DataType::Integer, raw, context)?;
    let negate = matches!(op, OperatorKind::IsChallengeNotCompleted);
    let not_token = if negate { "NOT " } else { "" };
    Ok(format!(
        "{not_token}EXISTS (SELECT 1 FROM {CHALLENGE_TABLE} WHERE challenge_id = {challenge_id} AND completed_date IS NOT NULL AND member_id = patients_member.id)"
    ))
}

fn compile_is_present(column_ref: &str, raw: &Value, context: &str) -> CompileResult<String> {
    let present = match raw {
        Value::Bool(b) => *b,
        Value::String(s) => match s.trim().to_uppercase().as_str() {
            "TRUE" => true,
            "FALSE" => false,
            other => {
                return Err(CompileError::BadValue {
                    reason: format!("is_present value must be TRUE or FALSE, found `{other}`"),
                    context: context.to_string(),
                })
            }
        },
        other => {
            return Err(CompileError::BadValue {
                reason: format!("is_present value must be a boolean, found {other}"),
                context: context.to_string(),
            })
        }
    };
    Ok(if present {
        format!("{column_ref} IS NOT NULL AND {column_ref} <> ''")
    } else {
        format!("{column_ref} IS NULL OR {column_ref} = ''")
    })
}

fn compile_in(
    registry: &SchemaRegistry,
    column_ref: &str,
    data_type: DataType,
    raw: &Value,
    context: &str,
) -> CompileResult<String> {
    let items = raw.as_array().ok_or_else(|| CompileError::BadValue {
        reason: "in_op requires a JSON array value".to_string(),
        context: context.to_string(),
    })?;
    let rendered: CompileResult<Vec<String>> = items
        .iter()
        .map(|v| render_value(registry, data_type, v, context))
        .collect();
    Ok(format!("{column_ref} IN ({})", rendered?.join(", ")))
}

fn describe_where(cond: &WhereCondition) -> String {
    let rendered = serde_json::json!({
        "field": cond.field.as_str(),
        "operator": cond.operator,
        "value": cond.value,
    });
    format!("where leaf {}", snippet(&rendered))
}
