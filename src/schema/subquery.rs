use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::ident::Id;
use crate::request::CompileRequest;
use crate::schema::custom_method::ParamType;
use crate::schema::field::DataType;
use crate::schema::placeholder::{extract_placeholders, names_match};

/// One entry of a subquery's `fields` map: a local field key the enclosing
/// predicate can reference (via a leaf's `subquery` + `alias`), naming the
/// derived table's output column (`alias`), its [`DataType`], and whether it
/// is the column the subquery composer should join on by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubqueryField {
    pub alias: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_member_id: bool,
}

#[derive(Debug, Clone)]
pub enum SubqueryBody {
    /// A raw SQL template, bound the same way a custom method is.
    Sql(String),
    /// A nested predicate request, compiled recursively.
    Predicate(Box<CompileRequest>),
}

#[derive(Debug, Clone)]
pub struct SubqueryDescriptor {
    pub id: Id,
    pub body: SubqueryBody,
    pub fields: HashMap<String, SubqueryField>,
    /// Only meaningful when `body` is `Sql`; empty for a nested predicate,
    /// which takes its parameters from the request tree itself.
    pub parameters: HashMap<String, ParamType>,
}

/// Wire shape of one subquery entry in a [`crate::schema::registry::SchemaBundle`].
/// `body`'s shape depends on `is_sql`: a JSON string when `true`, a nested
/// [`CompileRequest`] object when `false`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubqueryInput {
    pub id: Id,
    pub is_sql: bool,
    pub body: serde_json::Value,
    #[serde(default)]
    pub fields: HashMap<String, SubqueryField>,
    #[serde(default)]
    pub parameters: HashMap<String, ParamType>,
}

impl SubqueryDescriptor {
    pub(crate) fn from_input(input: SubqueryInput) -> Result<Self, SchemaError> {
        let body = if input.is_sql {
            let template = input
                .body
                .as_str()
                .ok_or_else(|| SchemaError::InvalidSubqueryBody {
                    id: input.id.to_string(),
                    reason: "is_sql is true but body is not a JSON string".to_string(),
                })?
                .trim()
                .to_string();
            if template.is_empty() {
                return Err(SchemaError::EmptyTemplate {
                    id: input.id.to_string(),
                });
            }
            let found = extract_placeholders(&template);
            if !names_match(input.parameters.keys(), &found) {
                let mut declared: Vec<String> = input.parameters.keys().cloned().collect();
                declared.sort();
                return Err(SchemaError::SubqueryParameterMismatch {
                    id: input.id.to_string(),
                    declared,
                    found: found.into_iter().collect(),
                });
            }
            SubqueryBody::Sql(template)
        } else {
            let request: CompileRequest =
                serde_json::from_value(input.body).map_err(|e| SchemaError::InvalidSubqueryBody {
                    id: input.id.to_string(),
                    reason: format!("invalid nested predicate body: {e}"),
                })?;
            SubqueryBody::Predicate(Box::new(request))
        };

        Ok(SubqueryDescriptor {
            id: input.id,
            body,
            fields: input.fields,
            parameters: input.parameters,
        })
    }
}
