///! Ingestion modules
///!
///! ## Pipeline stages
///! - `bulletin`: fetch and fingerprint bulletin pages, reduce them to text
///! - `classify`: bulletin type and object type
///! - `observation`: 80-column observation block and observer details
///! - `xref`: designation cross-references from Daily Orbit Updates
///! - `store`: SQLite persistence with per-station tables
///! - `stats`: per-station aggregates with change detection

pub mod bulletin;
pub mod classify;
pub mod observation;
pub mod observatory;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod xref;
