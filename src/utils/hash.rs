//! Content hashing using blake3.
//!
//! Output file names and service-worker revisions are derived from these
//! hashes, so identical input bytes always yield identical names.

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// First `len` hex chars, clamped to the full 64-char digest.
    pub fn short(self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len.min(64));
        hex
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = ContentHash::of("body { color: red }");
        let b = ContentHash::of(b"body { color: red }".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, ContentHash::of("body { color: blue }"));
    }

    #[test]
    fn test_short_clamps() {
        let h = ContentHash::of("x");
        assert_eq!(h.short(10).len(), 10);
        assert_eq!(h.short(200).len(), 64);
        assert!(h.to_hex().starts_with(&h.short(8)));
    }
}
