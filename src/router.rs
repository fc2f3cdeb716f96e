//! Shard routing
//!
//! Maps a key to a shard index by hashing it with SHA-1 and reducing
//! the first byte of the digest modulo the shard count.

use sha1::{Digest, Sha1};

/// Computes the shard index for `key` given `shard_count` shards.
pub fn route(key: &str, shard_count: usize) -> usize {
    debug_assert!(shard_count > 0);
    let digest = Sha1::digest(key.as_bytes());
    digest[0] as usize % shard_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(route("testGet", 256), route("testGet", 256));
    }

    #[test]
    fn stays_in_range() {
        for k in ["a", "b", "testContentArr", ""] {
            assert!(route(k, 16) < 16);
        }
    }

    #[test]
    fn distributes_across_many_keys() {
        let shard_count = 256;
        let mut seen = vec![false; shard_count];
        for i in 0..4096 {
            let key = format!("key-{i}");
            seen[route(&key, shard_count)] = true;
        }
        // Not every shard need be hit, but a SHA-1-derived router should
        // not collapse 4096 distinct keys onto a handful of shards.
        let hit = seen.iter().filter(|b| **b).count();
        assert!(hit > shard_count / 2);
    }
}
