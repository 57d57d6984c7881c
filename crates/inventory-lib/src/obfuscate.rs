//! Identity obfuscation
//!
//! Cluster, node and namespace names are replaced by their SHA-256 digest
//! when obfuscation is enabled. Digests are memoized for the lifetime of the
//! run only; the raw-to-digest mapping is never written anywhere.

use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Applies the identity transform chosen at the start of a run
#[derive(Debug, Default)]
pub struct Obfuscator {
    enabled: bool,
    cache: DashMap<String, String>,
}

impl Obfuscator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            cache: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Identity as it appears in the snapshot
    pub fn apply(&self, name: &str) -> String {
        if !self.enabled {
            return name.to_string();
        }

        if let Some(digest) = self.cache.get(name) {
            return digest.clone();
        }

        let digest = obfuscate(name);
        self.cache.insert(name.to_string(), digest.clone());
        digest
    }
}

/// One-way digest of a name: 64 lowercase hex characters
pub fn obfuscate(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obfuscate_is_deterministic() {
        assert_eq!(obfuscate("ns-1"), obfuscate("ns-1"));
        assert_ne!(obfuscate("ns-1"), obfuscate("ns-2"));
    }

    #[test]
    fn test_obfuscate_is_fixed_width_hex() {
        let digest = obfuscate("kube-system");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(obfuscate("").len(), 64);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            obfuscate("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_obfuscator_disabled_passes_through() {
        let obfuscator = Obfuscator::new(false);
        assert!(!obfuscator.is_enabled());
        assert_eq!(obfuscator.apply("default"), "default");
    }

    #[test]
    fn test_obfuscator_enabled_is_consistent() {
        let obfuscator = Obfuscator::new(true);
        let first = obfuscator.apply("payments");
        let second = obfuscator.apply("payments");
        assert_eq!(first, second);
        assert_eq!(first, obfuscate("payments"));
        assert_ne!(first, "payments");
    }
}
