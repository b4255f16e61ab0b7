//! Type-aware value rendering. This is the one place a `value` JSON
//! payload turns into a SQL literal — everything downstream (the predicate
//! evaluator, the template binder) calls through here rather than
//! hand-rolling its own quoting.

use serde_json::{Map, Value};

use crate::error::{CompileError, CompileResult};
use crate::ident::Id;
use crate::schema::{DataType, SchemaRegistry};
use crate::value::escape::quote_string;

const DYNAMIC_DATE_UNITS: [&str; 4] = ["DAY", "WEEK", "MONTH", "YEAR"];

/// Renders `raw` as a SQL literal for `data_type`. `context` is a short,
/// human-readable description of where this value came from — quoted back
/// in any `BadValue`/`UnknownVariable` error so a caller can locate the
/// fault without re-walking the whole request.
pub fn render_value(
    registry: &SchemaRegistry,
    data_type: DataType,
    raw: &Value,
    context: &str,
) -> CompileResult<String> {
    if let Some(obj) = raw.as_object() {
        if obj.contains_key("type") {
            return render_dynamic(registry, data_type, obj, context);
        }
    }

    match data_type {
        DataType::Integer => render_integer(raw, context),
        DataType::String => render_string(raw, context),
        DataType::Date => render_date(raw, context),
        DataType::Datetime => render_datetime(raw, context),
        DataType::Choice | DataType::Multichoice => render_choice(raw, context),
        DataType::Boolean | DataType::Nullboolean => render_boolean(data_type, raw, context),
    }
}

pub(crate) fn scalar_to_string(raw: &Value, context: &str) -> CompileResult<String> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(CompileError::BadValue {
            reason: format!("expected a scalar value, found {other}"),
            context: context.to_string(),
        }),
    }
}

fn render_integer(raw: &Value, context: &str) -> CompileResult<String> {
    let s = scalar_to_string(raw, context)?;
    s.trim().parse::<i64>().map(|v| v.to_string()).map_err(|_| {
        CompileError::BadValue {
            reason: format!("`{s}` is not an integer"),
            context: context.to_string(),
        }
    })
}

fn render_string(raw: &Value, context: &str) -> CompileResult<String> {
    let s = scalar_to_string(raw, context)?;
    Ok(quote_string(&s))
}

fn render_date(raw: &Value, context: &str) -> CompileResult<String> {
    let s = scalar_to_string(raw, context)?;
    chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| CompileError::BadValue {
        reason: format!("`{s}` is not a valid YYYY-MM-DD date"),
        context: context.to_string(),
    })?;
    Ok(quote_string(&s))
}

fn render_datetime(raw: &Value, context: &str) -> CompileResult<String> {
    let s = scalar_to_string(raw, context)?;
    let valid = chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").is_ok();
    if !valid {
        return Err(CompileError::BadValue {
            reason: format!(
                "`{s}` is not a valid YYYY-MM-DDTHH:MM:SS (or YYYY-MM-DD) datetime"
            ),
            context: context.to_string(),
        });
    }
    Ok(quote_string(&s))
}

fn render_choice(raw: &Value, context: &str) -> CompileResult<String> {
    let s = scalar_to_string(raw, context)?;
    if s.trim().parse::<i64>().is_ok() {
        Ok(s)
    } else {
        Ok(quote_string(&s))
    }
}

fn render_boolean(data_type: DataType, raw: &Value, context: &str) -> CompileResult<String> {
    if let Value::Bool(b) = raw {
        return Ok(if *b { "TRUE".to_string() } else { "FALSE".to_string() });
    }
    let s = scalar_to_string(raw, context)?;
    let upper = s.trim().to_uppercase();
    let allowed: &[&str] = if matches!(data_type, DataType::Nullboolean) {
        &["TRUE", "FALSE", "NULL"]
    } else {
        &["TRUE", "FALSE"]
    };
    if allowed.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(CompileError::BadValue {
            reason: format!("`{s}` is not a valid boolean literal"),
            context: context.to_string(),
        })
    }
}

fn render_dynamic(
    registry: &SchemaRegistry,
    field_type: DataType,
    obj: &Map<String, Value>,
    context: &str,
) -> CompileResult<String> {
    let kind = obj.get("type").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "DYNAMIC_DATE" => render_dynamic_date(obj, context),
        "VARIABLE_TEMPLATE" => render_variable_template(registry, field_type, obj, context),
        other => Err(CompileError::BadValue {
            reason: format!("unknown dynamic value type `{other}`"),
            context: context.to_string(),
        }),
    }
}

fn render_dynamic_date(obj: &Map<String, Value>, context: &str) -> CompileResult<String> {
    let has_any = obj.contains_key("operator") || obj.contains_key("offset") || obj.contains_key("unit");
    if !has_any {
        return Ok("NOW()".to_string());
    }

    let operator = obj
        .get("operator")
        .and_then(Value::as_str)
        .ok_or_else(|| CompileError::MissingKey {
            key: "operator".to_string(),
            context: context.to_string(),
        })?;
    let offset_raw = obj.get("offset").ok_or_else(|| CompileError::MissingKey {
        key: "offset".to_string(),
        context: context.to_string(),
    })?;
    let unit = obj
        .get("unit")
        .and_then(Value::as_str)
        .ok_or_else(|| CompileError::MissingKey {
            key: "unit".to_string(),
            context: context.to_string(),
        })?;

    let offset_str = scalar_to_string(offset_raw, context)?;
    let offset: i64 = offset_str.trim().parse().map_err(|_| CompileError::BadValue {
        reason: format!("`{offset_str}` is not an integer offset"),
        context: context.to_string(),
    })?;

    let unit_upper = unit.to_uppercase();
    if !DYNAMIC_DATE_UNITS.contains(&unit_upper.as_str()) {
        return Err(CompileError::BadValue {
            reason: format!("unknown dynamic-date unit `{unit}`"),
            context: context.to_string(),
        });
    }

    let func = match operator.to_uppercase().as_str() {
        "ADD" => "DATE_ADD",
        "SUB" => "DATE_SUB",
        other => {
            return Err(CompileError::BadValue {
                reason: format!("unknown dynamic-date operator `{other}`"),
                context: context.to_string(),
            })
        }
    };

    Ok(format!("{func}(NOW(), INTERVAL {offset} {unit_upper})"))
}

fn render_variable_template(
    registry: &SchemaRegistry,
    field_type: DataType,
    obj: &Map<String, Value>,
    context: &str,
) -> CompileResult<String> {
    let id_raw = obj.get("id").ok_or_else(|| CompileError::MissingKey {
        key: "id".to_string(),
        context: context.to_string(),
    })?;
    let id_str = scalar_to_string(id_raw, context)?;
    let id = Id::from(id_str.as_str());
    let template = registry
        .variable_template(&id)
        .ok_or_else(|| CompileError::UnknownVariable {
            variable_id: id_str.clone(),
            context: context.to_string(),
        })?;

    if template.return_type != field_type {
        return Err(CompileError::BadValue {
            reason: format!(
                "variable template `{id_str}` returns {:?}, but the field expects {:?}",
                template.return_type, field_type
            ),
            context: context.to_string(),
        });
    }

    let placeholder = format!("{{{}}}", template.keyword);
    Ok(match field_type {
        DataType::String | DataType::Date | DataType::Datetime => format!("'{placeholder}'"),
        _ => placeholder,
    })
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
    fn integer_rejects_non_numeric() {
        let reg = empty_registry();
        let err = render_value(&reg, DataType::Integer, &json!("abc"), "ctx").unwrap_err();
        assert!(matches!(err, CompileError::BadValue { .. }));
    }

    #[test]
    fn string_escapes_and_quotes() {
        let reg = empty_registry();
        let out = render_value(&reg, DataType::String, &json!("o'brien"), "ctx").unwrap();
        assert_eq!(out, "'o\\'brien'");
    }

    #[test]
    fn date_validates_format() {
        let reg = empty_registry();
        assert!(render_value(&reg, DataType::Date, &json!("2024-01-05"), "ctx").is_ok());
        assert!(render_value(&reg, DataType::Date, &json!("01/05/2024"), "ctx").is_err());
    }

    #[test]
    fn datetime_falls_back_to_date_only() {
        let reg = empty_registry();
        assert!(render_value(&reg, DataType::Datetime, &json!("2024-01-05T10:20:30"), "ctx").is_ok());
        assert!(render_value(&reg, DataType::Datetime, &json!("2024-01-05"), "ctx").is_ok());
        assert!(render_value(&reg, DataType::Datetime, &json!("2024-01-05 10:20:30"), "ctx").is_err());
    }

    #[test]
    fn choice_quotes_iff_not_integer() {
        let reg = empty_registry();
        assert_eq!(
            render_value(&reg, DataType::Choice, &json!("42"), "ctx").unwrap(),
            "42"
        );
        assert_eq!(
            render_value(&reg, DataType::Choice, &json!("red"), "ctx").unwrap(),
            "'red'"
        );
    }

    #[test]
    fn dynamic_date_with_no_args_is_now() {
        let reg = empty_registry();
        let out = render_value(&reg, DataType::Date, &json!({"type": "DYNAMIC_DATE"}), "ctx").unwrap();
        assert_eq!(out, "NOW()");
    }

    #[test]
    fn dynamic_date_add_interval() {
        let reg = empty_registry();
        let out = render_value(
            &reg,
            DataType::Date,
            &json!({"type": "DYNAMIC_DATE", "operator": "ADD", "offset": "3", "unit": "day"}),
            "ctx",
        )
        .unwrap();
        assert_eq!(out, "DATE_ADD(NOW(), INTERVAL 3 DAY)");
    }

    #[test]
    fn dynamic_date_rejects_unknown_unit() {
        let reg = empty_registry();
        let err = render_value(
            &reg,
            DataType::Date,
            &json!({"type": "DYNAMIC_DATE", "operator": "ADD", "offset": "3", "unit": "DECADE"}),
            "ctx",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::BadValue { .. }));
    }
}
