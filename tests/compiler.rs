//! Black-box tests against the public `Compiler` API: simple equality,
//! boolean folds with string escaping, `between`, join planning,
//! ambiguous-path rejection, custom methods, subqueries, and
//! schema-construction failures.

use std::collections::HashMap;

use jsonql::predicate::ast::{
    AggregateFn, CustomMethodInvocation, ParamValue, PredicateNode, WhereCondition,
};
use jsonql::request::{CompileOptions, CompileRequest, SelectField, SubqueryUsage};
use jsonql::schema::custom_method::{CustomMethod, ParamType};
use jsonql::schema::field::{DataType, FieldDescriptor};
use jsonql::schema::path::PathEdge;
use jsonql::schema::subquery::{SubqueryField, SubqueryInput};
use jsonql::schema::SchemaBundle;
use jsonql::{CompileError, Compiler, SchemaError};
use serde_json::json;

fn where_node(field: &str, operator: &str, value: serde_json::Value) -> PredicateNode {
    PredicateNode::Where(WhereCondition {
        field: field.into(),
        operator: operator.to_string(),
        value,
        secondary_value: None,
        aggregate_lhs: None,
        subquery: None,
        alias: None,
    })
}

fn request(fields: Vec<&str>, where_data: PredicateNode) -> CompileRequest {
    CompileRequest {
        fields: fields.into_iter().map(Into::into).collect(),
        where_data,
        group_by_fields: vec![],
        having: None,
        path_hints: HashMap::new(),
        sub_queries: HashMap::new(),
    }
}

#[test]
fn simple_equals_renders_count_select() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![
            FieldDescriptor {
                id: "1".into(),
                column: "age".to_string(),
                table: "users".to_string(),
                data_type: DataType::Integer,
            },
            FieldDescriptor {
                id: "2".into(),
                column: "name".to_string(),
                table: "users".to_string(),
                data_type: DataType::String,
            },
        ],
        ..Default::default()
    })
    .unwrap();

    let req = request(vec!["1"], where_node("1", "equals", json!("30")));
    let sql = compiler.compile(&req, "users", &CompileOptions::default()).unwrap();

    assert_eq!(
        sql,
        "SELECT COUNT(DISTINCT `users`.`id`) FROM users  WHERE `users`.`age` = 30 "
    );
}

#[test]
fn and_folds_children_and_escapes_string_literal() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![
            FieldDescriptor {
                id: "1".into(),
                column: "age".to_string(),
                table: "users".to_string(),
                data_type: DataType::Integer,
            },
            FieldDescriptor {
                id: "2".into(),
                column: "name".to_string(),
                table: "users".to_string(),
                data_type: DataType::String,
            },
        ],
        ..Default::default()
    })
    .unwrap();

    let where_data = PredicateNode::And(vec![
        where_node("1", "greater_than", json!("18")),
        where_node("2", "like", json!("o'brien")),
    ]);
    let req = request(vec!["1", "2"], where_data);
    let sql = compiler.compile(&req, "users", &CompileOptions::default()).unwrap();

    assert!(sql.contains("((`users`.`age` > 18) and (`users`.`name` LIKE 'o\\'brien'))"));
}

#[test]
fn between_renders_low_and_high_bounds() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![FieldDescriptor {
            id: "1".into(),
            column: "age".to_string(),
            table: "users".to_string(),
            data_type: DataType::Integer,
        }],
        ..Default::default()
    })
    .unwrap();

    let where_data = PredicateNode::Where(WhereCondition {
        field: "1".into(),
        operator: "between".to_string(),
        value: json!("1"),
        secondary_value: Some(json!("5")),
        aggregate_lhs: None,
        subquery: None,
        alias: None,
    });
    let req = request(vec!["1"], where_data);
    let sql = compiler.compile(&req, "users", &CompileOptions::default()).unwrap();

    assert!(sql.contains("`users`.`age` between 1 AND 5"));
}

#[test]
fn join_planning_emits_left_join() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![FieldDescriptor {
            id: "b1".into(),
            column: "value".to_string(),
            table: "B".to_string(),
            data_type: DataType::Integer,
        }],
        paths: vec![PathEdge {
            join_table: "B".to_string(),
            join_column: "b_id".to_string(),
            parent_table: "A".to_string(),
            parent_column: "id".to_string(),
            active_flag_column: None,
        }],
        ..Default::default()
    })
    .unwrap();

    let req = request(vec!["b1"], where_node("b1", "equals", json!("1")));
    let sql = compiler.compile(&req, "A", &CompileOptions::default()).unwrap();

    assert!(sql.contains("LEFT JOIN `B` ON `B`.`b_id` = `A`.`id`"));
}

#[test]
fn ambiguous_path_is_rejected() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![FieldDescriptor {
            id: "c1".into(),
            column: "value".to_string(),
            table: "C".to_string(),
            data_type: DataType::Integer,
        }],
        paths: vec![
            PathEdge {
                join_table: "C".to_string(),
                join_column: "a_id".to_string(),
                parent_table: "A".to_string(),
                parent_column: "id".to_string(),
                active_flag_column: None,
            },
            PathEdge {
                join_table: "C".to_string(),
                join_column: "b_id".to_string(),
                parent_table: "B".to_string(),
                parent_column: "id".to_string(),
                active_flag_column: None,
            },
        ],
        ..Default::default()
    })
    .unwrap();

    let req = request(vec!["c1"], where_node("c1", "equals", json!("1")));
    let err = compiler.compile(&req, "A", &CompileOptions::default()).unwrap_err();

    assert!(matches!(err, CompileError::AmbiguousPath { .. }));
}

#[test]
fn custom_method_binds_parameters() {
    let mut params = HashMap::new();
    params.insert("x".to_string(), ParamType::Integer);
    let compiler = Compiler::build(SchemaBundle {
        custom_methods: vec![CustomMethod {
            id: "7".into(),
            template: "foo({x})".to_string(),
            parameters: params,
        }],
        ..Default::default()
    })
    .unwrap();

    let mut parameters = HashMap::new();
    parameters.insert("x".to_string(), ParamValue { value: json!("42") });
    let where_data = PredicateNode::CustomMethod(CustomMethodInvocation {
        template_id: "7".into(),
        parameters,
    });
    let req = request(vec![], where_data);
    let sql = compiler.compile(&req, "users", &CompileOptions::default()).unwrap();
    assert!(sql.contains("WHERE foo(42)"));
}

#[test]
fn custom_method_extra_key_is_an_error() {
    let mut params = HashMap::new();
    params.insert("x".to_string(), ParamType::Integer);
    let compiler = Compiler::build(SchemaBundle {
        custom_methods: vec![CustomMethod {
            id: "7".into(),
            template: "foo({x})".to_string(),
            parameters: params,
        }],
        ..Default::default()
    })
    .unwrap();

    let mut parameters = HashMap::new();
    parameters.insert("x".to_string(), ParamValue { value: json!("42") });
    parameters.insert("y".to_string(), ParamValue { value: json!("1") });
    let where_data = PredicateNode::CustomMethod(CustomMethodInvocation {
        template_id: "7".into(),
        parameters,
    });
    let req = request(vec![], where_data);
    let err = compiler
        .compile(&req, "users", &CompileOptions::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::ExtraKey { .. }));
}

#[test]
fn group_by_and_having_with_aggregate() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![
            FieldDescriptor {
                id: "1".into(),
                column: "age".to_string(),
                table: "users".to_string(),
                data_type: DataType::Integer,
            },
            FieldDescriptor {
                id: "2".into(),
                column: "region".to_string(),
                table: "users".to_string(),
                data_type: DataType::String,
            },
        ],
        ..Default::default()
    })
    .unwrap();

    let having = PredicateNode::Where(WhereCondition {
        field: "1".into(),
        operator: "greater_than".to_string(),
        value: json!("21"),
        secondary_value: None,
        aggregate_lhs: Some(AggregateFn::Max),
        subquery: None,
        alias: None,
    });
    let req = CompileRequest {
        fields: vec!["2".into()],
        where_data: where_node("2", "equals", json!("west")),
        group_by_fields: vec!["2".into()],
        having: Some(having),
        path_hints: HashMap::new(),
        sub_queries: HashMap::new(),
    };
    let sql = compiler.compile(&req, "users", &CompileOptions::default()).unwrap();

    assert!(sql.contains("GROUP BY `users`.`region`"));
    assert!(sql.contains("HAVING MAX(`users`.`age`) > 21"));
}

#[test]
fn sql_subquery_is_spliced_as_a_left_join() {
    let mut sq_params = HashMap::new();
    sq_params.insert("status".to_string(), ParamType::String);
    let mut sq_fields = HashMap::new();
    sq_fields.insert(
        "member_id".to_string(),
        SubqueryField {
            alias: "member_id".to_string(),
            data_type: DataType::Integer,
            is_member_id: true,
        },
    );

    let compiler = Compiler::build(SchemaBundle {
        subqueries: vec![SubqueryInput {
            id: "active_orders".into(),
            is_sql: true,
            body: json!("SELECT member_id FROM orders WHERE status = {status}"),
            fields: sq_fields,
            parameters: sq_params,
        }],
        custom_methods: vec![CustomMethod {
            id: "noop".into(),
            template: "1 = 1".to_string(),
            parameters: HashMap::new(),
        }],
        ..Default::default()
    })
    .unwrap();

    let mut parameters = HashMap::new();
    parameters.insert("status".to_string(), ParamValue { value: json!("active") });
    let mut sub_queries = HashMap::new();
    sub_queries.insert(
        "orders_sq".to_string(),
        SubqueryUsage {
            subquery_id: "active_orders".into(),
            parameters,
        },
    );

    // No field in the registry is referenced, so the where clause is a
    // trivially-true custom method rather than a `where` leaf.
    let req = CompileRequest {
        fields: vec![],
        where_data: PredicateNode::CustomMethod(CustomMethodInvocation {
            template_id: "noop".into(),
            parameters: HashMap::new(),
        }),
        group_by_fields: vec![],
        having: None,
        path_hints: HashMap::new(),
        sub_queries,
    };
    let sql = compiler.compile(&req, "patients_member", &CompileOptions::default()).unwrap();

    assert!(sql.contains(
        "LEFT JOIN ( SELECT member_id FROM orders WHERE status = 'active' ) AS `orders_sq` ON `orders_sq`.`member_id` = `patients_member`.`id`"
    ));
}

#[test]
fn select_fields_override_default_count() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![FieldDescriptor {
            id: "1".into(),
            column: "age".to_string(),
            table: "users".to_string(),
            data_type: DataType::Integer,
        }],
        ..Default::default()
    })
    .unwrap();

    let req = request(vec!["1"], where_node("1", "equals", json!("30")));
    let options = CompileOptions {
        select_fields: vec![
            SelectField {
                field: "member_id".into(),
                alias: "id".to_string(),
                aggregate: None,
            },
            SelectField {
                field: "1".into(),
                alias: "age".to_string(),
                aggregate: Some(AggregateFn::Max),
            },
        ],
        alias_params: HashMap::new(),
        additional_where_clause: None,
    };
    let sql = compiler.compile(&req, "users", &options).unwrap();

    assert!(sql.starts_with(
        "SELECT `users`.`id` AS `id`, MAX(`users`.`age`) AS `age` FROM users"
    ));
}

#[test]
fn duplicate_field_id_fails_construction() {
    let err = Compiler::build(SchemaBundle {
        field_mapping: vec![
            FieldDescriptor {
                id: "1".into(),
                column: "age".to_string(),
                table: "users".to_string(),
                data_type: DataType::Integer,
            },
            FieldDescriptor {
                id: "1".into(),
                column: "other".to_string(),
                table: "users".to_string(),
                data_type: DataType::Integer,
            },
        ],
        ..Default::default()
    })
    .unwrap_err();

    assert!(matches!(err, SchemaError::DuplicateFieldId(_)));
}

#[test]
fn additional_where_clause_is_appended_verbatim() {
    let compiler = Compiler::build(SchemaBundle {
        field_mapping: vec![FieldDescriptor {
            id: "1".into(),
            column: "age".to_string(),
            table: "users".to_string(),
            data_type: DataType::Integer,
        }],
        ..Default::default()
    })
    .unwrap();

    let req = request(vec!["1"], where_node("1", "equals", json!("30")));
    let options = CompileOptions {
        select_fields: vec![],
        alias_params: HashMap::new(),
        additional_where_clause: Some("AND 1 = 1".to_string()),
    };
    let sql = compiler.compile(&req, "users", &options).unwrap();
    assert!(sql.contains("`users`.`age` = 30 AND 1 = 1"));
}
