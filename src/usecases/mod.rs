//! Application use cases. Orchestrate domain logic via ports.

pub mod availability_planner;
pub mod insight_aggregator;
pub mod prep_service;

pub use availability_planner::{AvailabilityPlanner, PlannerConfig};
pub use insight_aggregator::{ExecutionMode, InsightAggregator};
pub use prep_service::PrepService;
