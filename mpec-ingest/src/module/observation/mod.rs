pub mod columns;
pub mod observer_details;
pub mod parser;

pub use columns::{FixedWidthRecord, LINE_WIDTH};
pub use observer_details::ObserverDetails;
pub use parser::{ObservationLine, ParsedObservations, has_discovery_marker, parse_observations};
