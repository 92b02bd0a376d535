use sha2::{Digest, Sha256};

/// Size and SHA-256 digest of a source file's bytes.
///
/// The annotator records one of these per file when the run is built; a view
/// whose live fingerprint differs is stale and must not show annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub size: u64,
    pub hash: Vec<u8>,
}

impl ContentFingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len() as u64,
            hash: Sha256::digest(bytes).to_vec(),
        }
    }

    pub fn matches(&self, size: u64, hash: &[u8]) -> bool {
        self.size == size && self.hash == hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_match() {
        let a = ContentFingerprint::of(b"package main\n");
        let b = ContentFingerprint::of(b"package main\n");
        assert!(a.matches(b.size, &b.hash));
    }

    #[test]
    fn same_size_different_content_does_not_match() {
        let a = ContentFingerprint::of(b"x := 1");
        let b = ContentFingerprint::of(b"x := 2");
        assert_eq!(a.size, b.size);
        assert!(!a.matches(b.size, &b.hash));
    }
}
