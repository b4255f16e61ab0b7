use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::ident::Id;
use crate::schema::placeholder::{extract_placeholders, names_match};

/// A declared parameter's required shape. Governs both construction-time
/// validation and how the template binder renders the caller-supplied value
/// for that placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Field,
    Integer,
    String,
    Date,
    Operator,
    Boolean,
    VariableTemplate,
}

/// `(id, template_string, parameter_schema)`. The template contains named
/// `{placeholder}` tokens; `parameter_schema` maps each to a [`ParamType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomMethod {
    pub id: Id,
    pub template: String,
    pub parameters: HashMap<String, ParamType>,
}

impl CustomMethod {
    /// Validates the construction-time invariants: non-empty template, and
    /// the symmetric difference between declared parameter names and the
    /// placeholders actually found in the template is empty.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        let trimmed = self.template.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::EmptyTemplate {
                id: self.id.to_string(),
            });
        }

        let found = extract_placeholders(trimmed);
        if !names_match(self.parameters.keys(), &found) {
            let mut declared: Vec<String> = self.parameters.keys().cloned().collect();
            declared.sort();
            return Err(SchemaError::CustomMethodParameterMismatch {
                id: self.id.to_string(),
                declared,
                found: found.into_iter().collect(),
            });
        }

        Ok(())
    }

    /// The template with leading/trailing whitespace stripped, as stored
    /// after construction-time validation.
    pub fn template(&self) -> &str {
        self.template.trim()
    }
}
