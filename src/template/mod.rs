//! Template binder.

pub mod binder;

pub use binder::{bind_custom_method, bind_template};
