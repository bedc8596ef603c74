pub mod aggregate;
pub mod change;

pub use aggregate::StationAggregate;
pub use change::{AggregationReport, content_hash, run_aggregation, unit_id};
