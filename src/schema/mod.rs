//! Schema registry: field mapping, path graph, custom-method and
//! subquery templates, variable templates. Validated once at construction;
//! shared read-only by any number of compilations.

pub mod custom_method;
pub mod field;
mod placeholder;
pub mod path;
pub mod registry;
pub mod subquery;
pub mod variable_template;

pub use custom_method::{CustomMethod, ParamType};
pub use field::{DataType, FieldDescriptor};
pub use path::{PathEdge, PathGraph};
pub use registry::{SchemaBundle, SchemaRegistry};
pub use subquery::{SubqueryBody, SubqueryDescriptor, SubqueryField, SubqueryInput};
pub use variable_template::VariableTemplate;
