//! BLAKE3 hashing for logical IDs and record digests.

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Compute a composite hash from multiple components.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

/// First `len` hex characters of the BLAKE3 digest, uppercased.
pub fn short_digest(s: &str, len: usize) -> String {
    let hex = blake3::hash(s.as_bytes()).to_hex();
    hex.as_str()[..len.min(hex.len())].to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_string() {
        let h1 = hash_string("hello");
        let h2 = hash_string("hello");
        let h3 = hash_string("world");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert!(h1.starts_with("blake3:"));
        assert_eq!(h1.len(), 7 + 64);
    }

    #[test]
    fn test_composite_hash_is_order_sensitive() {
        let h = composite_hash(&["blake3:aaa", "blake3:bbb"]);
        assert!(h.starts_with("blake3:"));
        let h2 = composite_hash(&["blake3:bbb", "blake3:aaa"]);
        assert_ne!(h, h2);
    }

    #[test]
    fn test_composite_hash_separates_components() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(composite_hash(&["ab", "c"]), composite_hash(&["a", "bc"]));
    }

    #[test]
    fn test_short_digest() {
        let d = short_digest("VPC/PublicSubnet1/Subnet", 8);
        assert_eq!(d.len(), 8);
        assert!(d.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(d, short_digest("VPC/PublicSubnet1/Subnet", 8));
        assert_eq!(short_digest("x", 100).len(), 64);
    }
}
