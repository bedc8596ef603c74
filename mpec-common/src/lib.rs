///! Shared types for the MPEC ingestion pipeline
///!
///! Designation codec plus the normalized records written by the ingester
///! and read by the reporting jobs.

pub mod designation;
pub mod types;

pub use designation::{BulletinSequence, DesignationError, HalfMonth};
pub use types::*;
