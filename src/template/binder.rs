//! Template binder, shared by custom methods and SQL subqueries:
//! parameter type-check plus `{name}` interpolation.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::error::{CompileError, CompileResult};
use crate::ident::Id;
use crate::predicate::ast::ParamValue;
use crate::predicate::operator::OperatorKind;
use crate::schema::{CustomMethod, DataType, ParamType, SchemaRegistry};
use crate::value::{mysql_escape, render_value, scalar_to_string};

/// Binds `supplied` against `schema` and interpolates the result into
/// `template`. Used directly by the custom-method leaf and by the subquery
/// composer when a subquery's body `is_sql`.
pub fn bind_template(
    registry: &SchemaRegistry,
    template: &str,
    schema: &HashMap<String, ParamType>,
    supplied: &HashMap<String, ParamValue>,
    context: &str,
) -> CompileResult<String> {
    let declared: BTreeSet<&String> = schema.keys().collect();
    let provided: BTreeSet<&String> = supplied.keys().collect();

    if let Some(missing) = declared.difference(&provided).next() {
        return Err(CompileError::MissingKey {
            key: (*missing).clone(),
            context: context.to_string(),
        });
    }
    if let Some(extra) = provided.difference(&declared).next() {
        return Err(CompileError::ExtraKey {
            key: (*extra).clone(),
            context: context.to_string(),
        });
    }

    let mut rendered = HashMap::with_capacity(schema.len());
    for (name, param_type) in schema {
        let value = &supplied[name].value;
        rendered.insert(name.clone(), render_parameter(registry, *param_type, value, context)?);
    }

    Ok(interpolate(template, &rendered))
}

pub fn bind_custom_method(
    registry: &SchemaRegistry,
    method: &CustomMethod,
    supplied: &HashMap<String, ParamValue>,
    context: &str,
) -> CompileResult<String> {
    bind_template(registry, method.template(), &method.parameters, supplied, context)
}

fn render_parameter(
    registry: &SchemaRegistry,
    param_type: ParamType,
    value: &Value,
    context: &str,
) -> CompileResult<String> {
    match param_type {
        ParamType::Field => {
            let field_id_str = scalar_to_string(value, context)?;
            let field_id = Id::from(field_id_str.as_str());
            let field = registry.field(&field_id).ok_or_else(|| CompileError::UnknownField {
                field_id: field_id_str.clone(),
                context: context.to_string(),
            })?;
            Ok(format!("`{}`.`{}`", field.table, field.column))
        }
        ParamType::Integer => render_value(registry, DataType::Integer, value, context),
        ParamType::String => render_value(registry, DataType::String, value, context),
        ParamType::Date => render_value(registry, DataType::Date, value, context),
        ParamType::Operator => {
            let op_name = scalar_to_string(value, context)?;
            let op = OperatorKind::parse(&op_name, context)?;
            op.token().map(str::to_string).ok_or_else(|| CompileError::BadValue {
                reason: format!("operator `{op_name}` has no plain SQL token for template use"),
                context: context.to_string(),
            })
        }
        ParamType::Boolean => {
            let raw = scalar_to_string(value, context)?;
            let upper = raw.trim().to_uppercase();
            if ["TRUE", "FALSE", "NULL", "NOT NULL"].contains(&upper.as_str()) {
                Ok(upper)
            } else {
                Err(CompileError::BadValue {
                    reason: format!(
                        "boolean parameter must be one of TRUE, FALSE, NULL, NOT NULL, found `{raw}`"
                    ),
                    context: context.to_string(),
                })
            }
        }
        ParamType::VariableTemplate => {
            let raw = scalar_to_string(value, context)?;
            Ok(format!("{{{}}}", mysql_escape(&raw)))
        }
    }
}

/// Plain `{name}` substitution — no nesting, no format specifiers. A name
/// with no matching rendered value (impossible once `bind_template` has
/// validated the parameter set, but defensive against a caller calling this
/// directly with a mismatched map) is left untouched.
fn interpolate(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        match rest.find('{') {
            None => {
                out.push_str(rest);
                break;
            }
            Some(pos) => {
                out.push_str(&rest[..pos]);
                let after = &rest[pos + 1..];
                match after.find('}') {
                    Some(end) => {
                        let name = &after[..end];
                        match values.get(name) {
                            Some(v) => out.push_str(v),
                            None => {
                                out.push('{');
                                out.push_str(name);
                                out.push('}');
                            }
                        }
                        rest = &after[end + 1..];
                    }
                    None => {
                        out.push('{');
                        rest = after;
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBundle;
    use serde_json::json;

    fn empty_registry() -> SchemaRegistry {
        SchemaRegistry::build(SchemaBundle::default()).unwrap()
    }

    #[test]
    fn binds_integer_parameter() {
        let reg = empty_registry();
        let mut schema = HashMap::new();
        schema.insert("x".to_string(), ParamType::Integer);
        let mut supplied = HashMap::new();
        supplied.insert("x".to_string(), ParamValue { value: json!("42") });

        let sql = bind_template(&reg, "foo({x})", &schema, &supplied, "ctx").unwrap();
        assert_eq!(sql, "foo(42)");
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let reg = empty_registry();
        let mut schema = HashMap::new();
        schema.insert("x".to_string(), ParamType::Integer);
        let supplied = HashMap::new();

        let err = bind_template(&reg, "foo({x})", &schema, &supplied, "ctx").unwrap_err();
        assert!(matches!(err, CompileError::MissingKey { .. }));
    }

    #[test]
    fn extra_parameter_is_an_error() {
        let reg = empty_registry();
        let schema: HashMap<String, ParamType> = HashMap::new();
        let mut supplied = HashMap::new();
        supplied.insert("x".to_string(), ParamValue { value: json!("42") });

        let err = bind_template(&reg, "foo()", &schema, &supplied, "ctx").unwrap_err();
        assert!(matches!(err, CompileError::ExtraKey { .. }));
    }

    #[test]
    fn interpolate_leaves_unmatched_placeholder_untouched() {
        let values = HashMap::new();
        assert_eq!(interpolate("{x}", &values), "{x}");
    }
}
