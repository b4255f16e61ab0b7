//! Join planner.

pub mod planner;

pub use planner::{plan_joins, PlannedJoin};
