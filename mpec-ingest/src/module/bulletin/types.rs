///! Fetched bulletin data types

use mpec_common::BulletinSequence;
use sha2::{Digest, Sha256};

/// Raw page plus its change-detection fingerprint
#[derive(Debug, Clone)]
pub struct FetchedBulletin {
    pub sequence: BulletinSequence,
    pub url: String,
    pub raw: Vec<u8>,
    /// Lowercase hex SHA-256 of `raw`
    pub fingerprint: String,
}

impl FetchedBulletin {
    pub fn new(sequence: BulletinSequence, url: String, raw: Vec<u8>) -> Self {
        let fingerprint = fingerprint(&raw);
        Self {
            sequence,
            url,
            raw,
            fingerprint,
        }
    }

    pub fn bulletin_id(&self) -> String {
        self.sequence.bulletin_id()
    }

    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_sha256() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint(b"MPEC"), fingerprint(b"MPEC"));
        assert_ne!(fingerprint(b"MPEC"), fingerprint(b"MPEC "));
    }
}
