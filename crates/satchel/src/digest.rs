//! Digest algorithms and the streaming hash fan-out.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use digest::{Digest, DynDigest};
use serde::{Deserialize, Serialize};

/// A digest algorithm a manifest can be written with.
///
/// The enum doubles as the registry: every representable algorithm has a
/// hasher, so an unknown algorithm name fails at the name-resolution
/// boundary and nowhere else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

/// Every supported algorithm, weakest first.
pub const ALL_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::Md5,
    Algorithm::Sha1,
    Algorithm::Sha224,
    Algorithm::Sha256,
    Algorithm::Sha384,
    Algorithm::Sha512,
];

impl Algorithm {
    /// Resolve a lowercase algorithm name as it appears in manifest
    /// filenames and profile JSON.
    pub fn from_name(name: &str) -> Option<Algorithm> {
        match name {
            "md5" => Some(Algorithm::Md5),
            "sha1" => Some(Algorithm::Sha1),
            "sha224" => Some(Algorithm::Sha224),
            "sha256" => Some(Algorithm::Sha256),
            "sha384" => Some(Algorithm::Sha384),
            "sha512" => Some(Algorithm::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha224 => "sha224",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Relative preference when a single algorithm must be chosen.
    pub fn strength(self) -> u8 {
        match self {
            Algorithm::Sha512 => 6,
            Algorithm::Sha256 => 5,
            Algorithm::Sha384 => 4,
            Algorithm::Sha224 => 3,
            Algorithm::Sha1 => 2,
            Algorithm::Md5 => 1,
        }
    }

    /// The strongest algorithm in a set, by [`Algorithm::strength`].
    pub fn strongest_of<'a>(set: impl IntoIterator<Item = &'a Algorithm>) -> Option<Algorithm> {
        set.into_iter().copied().max_by_key(|a| a.strength())
    }

    fn new_digest(self) -> Box<dyn DynDigest> {
        match self {
            Algorithm::Md5 => Box::new(md5::Md5::new()),
            Algorithm::Sha1 => Box::new(sha1::Sha1::new()),
            Algorithm::Sha224 => Box::new(sha2::Sha224::new()),
            Algorithm::Sha256 => Box::new(sha2::Sha256::new()),
            Algorithm::Sha384 => Box::new(sha2::Sha384::new()),
            Algorithm::Sha512 => Box::new(sha2::Sha512::new()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A streaming hasher for one algorithm.
pub struct Hasher {
    algorithm: Algorithm,
    inner: Box<dyn DynDigest>,
}

impl Hasher {
    pub fn new(algorithm: Algorithm) -> Self {
        Hasher {
            algorithm,
            inner: algorithm.new_digest(),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Finish the stream, yielding the lowercase hex digest.
    pub fn finish(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

/// Deduplicated hashing fan-out: one hasher per requested algorithm, all
/// fed from the same byte stream.
pub struct HasherSet {
    hashers: Vec<Hasher>,
}

impl HasherSet {
    pub fn new(algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        let unique: BTreeSet<Algorithm> = algorithms.into_iter().collect();
        HasherSet {
            hashers: unique.into_iter().map(Hasher::new).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hashers.is_empty()
    }

    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.hashers.iter().map(Hasher::algorithm).collect()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        for hasher in &mut self.hashers {
            hasher.update(chunk);
        }
    }

    /// Drain every hasher into an algorithm-to-hex map.
    pub fn finish(self) -> BTreeMap<Algorithm, String> {
        self.hashers
            .into_iter()
            .map(|h| (h.algorithm(), h.finish()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        for algorithm in ALL_ALGORITHMS {
            assert_eq!(Algorithm::from_name(algorithm.name()), Some(algorithm));
        }
        assert_eq!(Algorithm::from_name("crc32"), None);
        assert_eq!(Algorithm::from_name("SHA256"), None);
    }

    #[test]
    fn known_digest_vectors() {
        let mut md5 = Hasher::new(Algorithm::Md5);
        md5.update(b"");
        assert_eq!(md5.finish(), "d41d8cd98f00b204e9800998ecf8427e");

        let mut sha256 = Hasher::new(Algorithm::Sha256);
        sha256.update(b"abc");
        assert_eq!(
            sha256.finish(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn chunked_updates_match_one_shot() {
        let mut whole = Hasher::new(Algorithm::Sha1);
        whole.update(b"satchel test payload");

        let mut parts = Hasher::new(Algorithm::Sha1);
        parts.update(b"satchel ");
        parts.update(b"test ");
        parts.update(b"payload");

        assert_eq!(whole.finish(), parts.finish());
    }

    #[test]
    fn hasher_set_deduplicates() {
        let set = HasherSet::new([Algorithm::Sha256, Algorithm::Md5, Algorithm::Sha256]);
        assert_eq!(set.algorithms(), vec![Algorithm::Md5, Algorithm::Sha256]);

        let mut set = set;
        set.update(b"abc");
        let digests = set.finish();
        assert_eq!(digests.len(), 2);
        assert_eq!(
            digests[&Algorithm::Sha256],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn strongest_prefers_sha512_then_sha256() {
        let set = [Algorithm::Md5, Algorithm::Sha384, Algorithm::Sha256];
        assert_eq!(Algorithm::strongest_of(&set), Some(Algorithm::Sha256));
        let set = [Algorithm::Sha512, Algorithm::Sha256];
        assert_eq!(Algorithm::strongest_of(&set), Some(Algorithm::Sha512));
        assert_eq!(Algorithm::strongest_of(&[]), None);
    }
}
