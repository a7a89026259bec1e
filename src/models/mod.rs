pub mod plan;

pub use plan::{Intervals, PlanError, SessionPlan};
