//! Consistent-hash ring mapping keys to owning peers.
//!
//! Each logical member is placed on the ring at several synthetic positions
//! (replicas) so that ownership is spread evenly even with few members. A key
//! is owned by the member at the first position clockwise from the key's own
//! hash.
//!
//! The ring is a pure function of its inputs and never errors. It is not safe
//! for concurrent mutation: builders construct a new instance per membership
//! epoch and publish it wholesale under the enclosing structure's lock.

use std::collections::HashMap;
use std::sync::Arc;

/// Pluggable 32-bit hash used for ring placement.
///
/// A fast non-cryptographic checksum is sufficient: keys are not adversarial
/// inputs to the ring. The default is [`Crc32Hasher`].
pub trait RingHasher {
    /// Hashes `data` to a position on the ring.
    fn hash(&self, data: &[u8]) -> u32;
}

/// Default ring hash: CRC-32 (IEEE) checksum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Hasher;

impl RingHasher for Crc32Hasher {
    #[inline]
    fn hash(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

impl RingHasher for fn(&[u8]) -> u32 {
    #[inline]
    fn hash(&self, data: &[u8]) -> u32 {
        self(data)
    }
}

impl<H> RingHasher for Arc<H>
where
    H: RingHasher + ?Sized,
{
    #[inline]
    fn hash(&self, data: &[u8]) -> u32 {
        (**self).hash(data)
    }
}

/// A consistent-hash ring over a set of named members.
///
/// For each member added, `replicas` synthetic positions are inserted by
/// hashing the decimal replica index concatenated with the member name.
/// Hash collisions across members are astronomically rare; when they occur
/// the last writer wins on the owner map and the duplicate position is
/// harmless after sorting.
pub struct Ring<H = Crc32Hasher> {
    replicas: usize,
    hasher: H,
    /// Sorted ring positions.
    hashes: Vec<u32>,
    /// Position -> owning member.
    owners: HashMap<u32, String>,
}

impl Ring<Crc32Hasher> {
    /// Creates an empty ring with the default CRC-32 hash.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, Crc32Hasher)
    }
}

impl<H> Ring<H>
where
    H: RingHasher,
{
    /// Creates an empty ring with a custom placement hash.
    pub fn with_hasher(replicas: usize, hasher: H) -> Self {
        Ring {
            replicas,
            hasher,
            hashes: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Returns `true` when no positions are present.
    ///
    /// A ring built with `replicas == 0` stays empty no matter how many
    /// members are added: there are no owners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Adds members to the ring, placing `replicas` positions for each.
    ///
    /// The position sequence is re-sorted after the batch, so the ring is
    /// immediately queryable.
    pub fn add<I, S>(&mut self, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for member in members {
            let member = member.into();
            for replica in 0..self.replicas {
                let hash = self.hasher.hash(format!("{replica}{member}").as_bytes());
                self.hashes.push(hash);
                self.owners.insert(hash, member.clone());
            }
        }
        self.hashes.sort_unstable();
    }

    /// Returns the member owning `key`, or `None` when the ring is empty.
    ///
    /// For a fixed hasher, replica count, and member set this is a pure
    /// function of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        let hash = self.hasher.hash(key.as_bytes());
        let mut idx = self.hashes.partition_point(|&pos| pos < hash);
        if idx == self.hashes.len() {
            // Wrapped past the highest position: back to the first replica.
            idx = 0;
        }
        self.owners.get(&self.hashes[idx]).map(String::as_str)
    }

    /// Number of positions currently on the ring.
    #[inline]
    pub fn positions(&self) -> usize {
        self.hashes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats the synthetic "<replica><member>" string as a decimal number,
    /// giving fully predictable ring positions.
    fn decimal_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data).unwrap().parse().unwrap()
    }

    fn decimal_ring(replicas: usize) -> Ring<fn(&[u8]) -> u32> {
        Ring::with_hasher(replicas, decimal_hash as fn(&[u8]) -> u32)
    }

    #[test]
    fn maps_keys_to_nearest_clockwise_member() {
        let mut ring = decimal_ring(3);
        // Positions: 2, 4, 6, 12, 14, 16, 22, 24, 26.
        ring.add(["6", "4", "2"]);

        assert_eq!(ring.get("2"), Some("2"));
        assert_eq!(ring.get("11"), Some("2"));
        assert_eq!(ring.get("23"), Some("4"));
        // 27 is past the highest position and wraps to the first.
        assert_eq!(ring.get("27"), Some("2"));
    }

    #[test]
    fn membership_change_moves_only_affected_keys() {
        let mut ring = decimal_ring(3);
        ring.add(["6", "4", "2"]);
        // Adds positions 8, 18, 28.
        ring.add(["8"]);

        assert_eq!(ring.get("2"), Some("2"));
        assert_eq!(ring.get("11"), Some("2"));
        assert_eq!(ring.get("23"), Some("4"));
        assert_eq!(ring.get("27"), Some("8"));
    }

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = Ring::new(50);
        assert!(ring.is_empty());
        assert_eq!(ring.get("anything"), None);
    }

    #[test]
    fn zero_replicas_produce_an_empty_ring() {
        let mut ring = Ring::new(0);
        ring.add(["a", "b", "c"]);
        assert!(ring.is_empty());
        assert_eq!(ring.get("k"), None);
    }

    #[test]
    fn lookup_is_deterministic() {
        let mut ring = Ring::new(50);
        ring.add(["alpha", "beta", "gamma"]);
        for key in ["", "k", "key-1", "a much longer key than usual"] {
            let first = ring.get(key).map(str::to_owned);
            for _ in 0..10 {
                assert_eq!(ring.get(key).map(str::to_owned), first);
            }
        }
    }

    #[test]
    fn rebuilding_with_the_same_members_preserves_ownership() {
        let mut ring = Ring::new(50);
        ring.add(["alpha", "beta", "gamma"]);

        // Same member set assembled in a different order and in two batches.
        let mut rebuilt = Ring::new(50);
        rebuilt.add(["gamma"]);
        rebuilt.add(["alpha", "beta"]);

        for i in 0..200 {
            let key = format!("key-{i}");
            assert_eq!(ring.get(&key), rebuilt.get(&key));
        }
    }

    #[test]
    fn replicas_spread_members_across_the_ring() {
        let mut ring = Ring::new(50);
        ring.add(["alpha", "beta"]);
        assert_eq!(ring.positions(), 100);

        let mut alpha = 0usize;
        for i in 0..1000 {
            if ring.get(&format!("key-{i}")) == Some("alpha") {
                alpha += 1;
            }
        }
        // With 50 replicas per member the split stays far from degenerate.
        assert!((200..=800).contains(&alpha), "alpha owned {alpha}/1000");
    }
}
