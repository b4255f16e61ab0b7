use serde::{Deserialize, Serialize};

use crate::ident::Id;

/// Scalar data types a [`FieldDescriptor`] (or a variable template's return
/// value) can carry. Drives both value rendering and the variable-template
/// return-type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    String,
    Date,
    Datetime,
    Boolean,
    Nullboolean,
    Choice,
    Multichoice,
}

/// Immutable `(id, column, table, type)` record. Owned by the schema
/// registry and looked up by id from both predicate leaves and custom-method
/// `field`-typed parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: Id,
    pub column: String,
    pub table: String,
    pub data_type: DataType,
}
