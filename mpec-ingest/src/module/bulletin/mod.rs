///! Bulletin retrieval
///!
///! Fetches bulletin pages from the archive, fingerprints them for change
///! detection, and reduces them to visible text.

pub mod types;
pub mod fetcher;
pub mod text;

pub use fetcher::{AttemptError, BulletinSource, HttpBulletinSource, RetryPolicy};
pub use text::BulletinPage;
pub use types::{FetchedBulletin, fingerprint};
