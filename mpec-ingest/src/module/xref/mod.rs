pub mod parser;

pub use parser::{XrefEntry, extract_cross_references};
