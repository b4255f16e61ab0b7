use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::SchemaError;
use crate::ident::Id;
use crate::schema::custom_method::CustomMethod;
use crate::schema::field::FieldDescriptor;
use crate::schema::path::{PathEdge, PathGraph};
use crate::schema::subquery::{SubqueryDescriptor, SubqueryInput};
use crate::schema::variable_template::VariableTemplate;

/// Construction input: the five owned tables a caller hands the
/// compiler once, up front.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchemaBundle {
    #[serde(default)]
    pub field_mapping: Vec<FieldDescriptor>,
    #[serde(default)]
    pub paths: Vec<PathEdge>,
    #[serde(default)]
    pub custom_methods: Vec<CustomMethod>,
    #[serde(default)]
    pub subqueries: Vec<SubqueryInput>,
    #[serde(default)]
    pub variable_templates: Vec<VariableTemplate>,
}

#[derive(Debug)]
struct RegistryInner {
    fields: HashMap<String, FieldDescriptor>,
    paths: PathGraph,
    custom_methods: HashMap<String, CustomMethod>,
    subqueries: HashMap<String, SubqueryDescriptor>,
    variable_templates: HashMap<String, VariableTemplate>,
}

/// The schema registry. Validated once at construction; every
/// downstream lookup the predicate evaluator performs against a constructed
/// registry is guaranteed to succeed for inputs the evaluator accepts.
///
/// Cheap to `Clone` — an `Arc` around an immutable snapshot — so the same
/// registry can back any number of concurrent compilations.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    inner: Arc<RegistryInner>,
}

impl SchemaRegistry {
    /// Validates and builds a registry from a [`SchemaBundle`]. Fails fast
    /// on the first violation encountered, in validation-policy order,
    /// logging each at `warn` before returning it.
    pub fn build(bundle: SchemaBundle) -> Result<Self, SchemaError> {
        let mut fields = HashMap::with_capacity(bundle.field_mapping.len());
        for field in bundle.field_mapping {
            let key = field.id.to_string();
            if fields.insert(key.clone(), field).is_some() {
                log::warn!("schema validation failed: duplicate field id `{key}`");
                return Err(SchemaError::DuplicateFieldId(key));
            }
        }

        let mut path_builder = PathGraph::builder();
        for edge in bundle.paths {
            path_builder.insert(edge).inspect_err(|e| {
                log::warn!("schema validation failed: {e}");
            })?;
        }
        let paths = path_builder.build();

        let mut custom_methods = HashMap::with_capacity(bundle.custom_methods.len());
        for method in bundle.custom_methods {
            method.validate().inspect_err(|e| {
                log::warn!("schema validation failed: {e}");
            })?;
            let key = method.id.to_string();
            if custom_methods.insert(key.clone(), method).is_some() {
                log::warn!("schema validation failed: duplicate custom method id `{key}`");
                return Err(SchemaError::DuplicateCustomMethodId(key));
            }
        }

        let mut subqueries = HashMap::with_capacity(bundle.subqueries.len());
        for input in bundle.subqueries {
            let descriptor = SubqueryDescriptor::from_input(input).inspect_err(|e| {
                log::warn!("schema validation failed: {e}");
            })?;
            let key = descriptor.id.to_string();
            if subqueries.insert(key.clone(), descriptor).is_some() {
                log::warn!("schema validation failed: duplicate subquery id `{key}`");
                return Err(SchemaError::DuplicateSubqueryId(key));
            }
        }

        let mut variable_templates = HashMap::with_capacity(bundle.variable_templates.len());
        for template in bundle.variable_templates {
            let key = template.id.to_string();
            if variable_templates.insert(key.clone(), template).is_some() {
                log::warn!("schema validation failed: duplicate variable template id `{key}`");
                return Err(SchemaError::DuplicateVariableTemplateId(key));
            }
        }

        log::debug!(
            "schema registry built: {} fields, {} custom methods, {} subqueries, {} variable templates",
            fields.len(),
            custom_methods.len(),
            subqueries.len(),
            variable_templates.len()
        );

        Ok(SchemaRegistry {
            inner: Arc::new(RegistryInner {
                fields,
                paths,
                custom_methods,
                subqueries,
                variable_templates,
            }),
        })
    }

    pub fn field(&self, id: &Id) -> Option<&FieldDescriptor> {
        self.inner.fields.get(id.as_str())
    }

    pub fn paths(&self) -> &PathGraph {
        &self.inner.paths
    }

    pub fn custom_method(&self, id: &Id) -> Option<&CustomMethod> {
        self.inner.custom_methods.get(id.as_str())
    }

    pub fn subquery(&self, id: &Id) -> Option<&SubqueryDescriptor> {
        self.inner.subqueries.get(id.as_str())
    }

    pub fn variable_template(&self, id: &Id) -> Option<&VariableTemplate> {
        self.inner.variable_templates.get(id.as_str())
    }
}
