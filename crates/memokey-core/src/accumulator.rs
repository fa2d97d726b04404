//! # Hash Accumulator: Forkable Streaming Hash State
//!
//! [`HashAccumulator`] wraps a general-purpose hash primitive behind the
//! narrow [`HashPrimitive`] interface: bytes stream in, a 32-byte digest
//! comes out, and the state can be forked into an independent copy.
//!
//! Reading a digest never closes the stream. `digest()` finalizes a copy of
//! the state, so it is pure and may be called repeatedly between updates.
//! The traversal code never names a concrete primitive, so a stronger one
//! can be substituted by implementing [`HashPrimitive`].

use std::cmp::Ordering;
use std::fmt;

use crate::digest::{Digest, HashAlgorithm, DIGEST_LEN};

/// A streaming hash primitive with non-destructive finalization.
pub trait HashPrimitive: Send + Sync {
    /// Append raw bytes to the stream.
    fn update(&mut self, data: &[u8]);

    /// Finalize a copy of the current state. Must not alter `self`.
    fn snapshot(&self) -> [u8; DIGEST_LEN];

    /// An independent copy of the current state.
    fn fork(&self) -> Box<dyn HashPrimitive>;
}

impl HashPrimitive for sha2::Sha256 {
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(self, data);
    }

    fn snapshot(&self) -> [u8; DIGEST_LEN] {
        sha2::Digest::finalize(self.clone()).into()
    }

    fn fork(&self) -> Box<dyn HashPrimitive> {
        Box::new(self.clone())
    }
}

impl HashPrimitive for blake3::Hasher {
    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn snapshot(&self) -> [u8; DIGEST_LEN] {
        *self.finalize().as_bytes()
    }

    fn fork(&self) -> Box<dyn HashPrimitive> {
        Box::new(self.clone())
    }
}

/// Build a fresh primitive for the given algorithm.
pub fn primitive_for(algorithm: HashAlgorithm) -> Box<dyn HashPrimitive> {
    match algorithm {
        HashAlgorithm::Sha256 => Box::new(<sha2::Sha256 as sha2::Digest>::new()),
        HashAlgorithm::Blake3 => Box::new(blake3::Hasher::new()),
    }
}

/// Mutable streaming hash state used by the recursive digest walk.
///
/// Comparison operators act on [`digest()`](Self::digest) bytes only.
pub struct HashAccumulator {
    inner: Box<dyn HashPrimitive>,
}

impl HashAccumulator {
    /// An empty accumulator over the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            inner: primitive_for(algorithm),
        }
    }

    /// An accumulator whose stream starts with `seed`.
    pub fn seeded(algorithm: HashAlgorithm, seed: &[u8]) -> Self {
        let mut acc = Self::new(algorithm);
        acc.update(seed);
        acc
    }

    /// Wrap a caller-supplied primitive.
    pub fn with_primitive(inner: Box<dyn HashPrimitive>) -> Self {
        Self { inner }
    }

    /// Continue from a copy of another accumulator's state.
    pub fn from_accumulator(other: &HashAccumulator) -> Self {
        other.fork()
    }

    /// Append raw bytes. Order-sensitive.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Fold in a child result.
    ///
    /// Sibling order matters; callers that need order-insensitivity sort
    /// child digests first.
    pub fn combine(&mut self, child: &Digest) {
        self.inner.update(child.as_bytes());
    }

    /// An independent continuation of the current state. Updates to the
    /// fork never reach `self`.
    pub fn fork(&self) -> Self {
        Self {
            inner: self.inner.fork(),
        }
    }

    /// The digest of everything streamed so far. Repeatable.
    pub fn digest(&self) -> Digest {
        Digest::from_bytes(self.inner.snapshot())
    }

    /// Lowercase hex of [`digest()`](Self::digest).
    pub fn hexdigest(&self) -> String {
        self.digest().to_hex()
    }
}

impl Clone for HashAccumulator {
    fn clone(&self) -> Self {
        self.fork()
    }
}

impl fmt::Debug for HashAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashAccumulator")
            .field("digest", &self.hexdigest())
            .finish()
    }
}

impl PartialEq for HashAccumulator {
    fn eq(&self, other: &Self) -> bool {
        self.digest() == other.digest()
    }
}

impl Eq for HashAccumulator {}

impl PartialOrd for HashAccumulator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashAccumulator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digest().cmp(&other.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let acc = HashAccumulator::seeded(HashAlgorithm::Sha256, b"hello world");
        assert_eq!(
            acc.hexdigest(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn empty_sha256_vector() {
        let acc = HashAccumulator::new(HashAlgorithm::Sha256);
        assert_eq!(
            acc.hexdigest(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn blake3_matches_reference() {
        let acc = HashAccumulator::seeded(HashAlgorithm::Blake3, b"abc");
        assert_eq!(acc.digest().as_bytes(), blake3::hash(b"abc").as_bytes());
    }

    #[test]
    fn digest_is_repeatable_and_non_destructive() {
        let mut acc = HashAccumulator::new(HashAlgorithm::Sha256);
        acc.update(b"hello ");
        let first = acc.digest();
        assert_eq!(first, acc.digest());
        acc.update(b"world");
        assert_ne!(first, acc.digest());
        assert_eq!(
            acc.digest(),
            HashAccumulator::seeded(HashAlgorithm::Sha256, b"hello world").digest()
        );
    }

    #[test]
    fn fork_is_independent() {
        let acc = HashAccumulator::seeded(HashAlgorithm::Blake3, b"base");
        let before = acc.digest();
        let mut fork = acc.fork();
        fork.update(b"speculative");
        assert_eq!(acc.digest(), before);
        assert_ne!(fork.digest(), before);

        let copy = HashAccumulator::from_accumulator(&acc);
        assert_eq!(copy, acc);
    }

    #[test]
    fn combine_is_update_of_digest_bytes() {
        let child = HashAccumulator::seeded(HashAlgorithm::Sha256, b"child").digest();
        let mut a = HashAccumulator::new(HashAlgorithm::Sha256);
        a.combine(&child);
        let mut b = HashAccumulator::new(HashAlgorithm::Sha256);
        b.update(child.as_bytes());
        assert_eq!(a, b);
    }

    #[test]
    fn combine_order_matters() {
        let x = HashAccumulator::seeded(HashAlgorithm::Sha256, b"x").digest();
        let y = HashAccumulator::seeded(HashAlgorithm::Sha256, b"y").digest();
        let mut xy = HashAccumulator::new(HashAlgorithm::Sha256);
        xy.combine(&x);
        xy.combine(&y);
        let mut yx = HashAccumulator::new(HashAlgorithm::Sha256);
        yx.combine(&y);
        yx.combine(&x);
        assert_ne!(xy, yx);
    }

    #[test]
    fn ordering_follows_digest() {
        let a = HashAccumulator::seeded(HashAlgorithm::Sha256, b"a");
        let b = HashAccumulator::seeded(HashAlgorithm::Sha256, b"b");
        assert_eq!(a.cmp(&b), a.digest().cmp(&b.digest()));
    }

    #[test]
    fn algorithms_differ() {
        let s = HashAccumulator::seeded(HashAlgorithm::Sha256, b"same");
        let b = HashAccumulator::seeded(HashAlgorithm::Blake3, b"same");
        assert_ne!(s.digest(), b.digest());
    }
}
