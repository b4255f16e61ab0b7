use serde::{Deserialize, Serialize};

use crate::ident::Id;
use crate::schema::field::DataType;

/// `(id, keyword, return_type)`. Compiling a leaf whose value names a
/// variable template emits the opaque placeholder `{keyword}`, left for a
/// post-processor outside this crate to substitute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableTemplate {
    pub id: Id,
    pub keyword: String,
    pub return_type: DataType,
}
