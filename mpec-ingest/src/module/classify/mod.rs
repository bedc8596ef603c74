pub mod elements;
pub mod object_type;
pub mod pha;
pub mod rules;

pub use elements::OrbitalElements;
pub use object_type::classify_object;
pub use pha::PhaList;
pub use rules::classify_bulletin;
