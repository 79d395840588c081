use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content address of a resource locator: sha256 of the locator string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn of(locator: &str) -> Self {
        let digest = Sha256::digest(locator.as_bytes());
        Self(digest.into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }

    /// Lowercase hex, safe as a file name or a SQL text key.
    pub fn to_hex(&self) -> String { hex::encode(self.0) }

    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let arr: [u8; 32] = raw.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // short form for logs
        f.write_str(&self.to_hex()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_distinct() {
        let a = ContentKey::of("https://pp.userapi.com/a.jpg");
        let b = ContentKey::of("https://pp.userapi.com/a.jpg");
        let c = ContentKey::of("https://pp.userapi.com/b.jpg");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hex_roundtrip_and_known_digest() {
        let k = ContentKey::of("");
        assert_eq!(k.to_hex(), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert_eq!(ContentKey::from_hex(&k.to_hex()), Some(k));
        assert_eq!(ContentKey::from_hex("zz"), None);
    }
}
