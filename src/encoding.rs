//! Digest type and hashing helpers.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{de::Deserializer, ser::Serializer, Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Number of bytes in a digest.
pub const DIGEST_SIZE: usize = 32;

/// The digest of no content, used to mark mask entries.
pub const NULL_DIGEST: Digest = Digest([0; DIGEST_SIZE]);

/// A unique cryptographic hash identifying a stored object.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Computes the digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Computes the canonical filesystem path representation of the digest.
    ///
    /// The parent directory is the first two characters of the lowercase hex
    /// encoding, joined with the remainder.
    pub fn to_path_buf(&self) -> PathBuf {
        let text = self.to_string();
        Path::new(&text[0..2]).join(&text[2..])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}({})", stringify!(Digest), self)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Digest {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut buf = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(s, &mut buf)?;
        Ok(Digest(buf))
    }
}

impl PartialOrd for Digest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Digest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: [u8; DIGEST_SIZE] = hex::serde::deserialize(deserializer)?;
        Ok(Digest(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

/// An incremental hasher that computes digests.
#[derive(Default)]
pub struct Hasher(Sha256);

impl Hasher {
    pub fn new() -> Self {
        Hasher(Sha256::new())
    }

    /// Adds input bytes to the hash state. Can be called any number of times.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        sha2::Digest::update(&mut self.0, bytes);
        self
    }

    /// Finalizes the hash state and returns the computed `Digest`.
    pub fn finish(self) -> Digest {
        let output = self.0.finalize();
        let mut buf = [0u8; DIGEST_SIZE];
        buf.copy_from_slice(&output);
        Digest(buf)
    }
}

impl Debug for Hasher {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(stringify!(Hasher))
    }
}

/// Wraps an I/O writer and hashes its contents, producing a `Digest`.
#[derive(Debug)]
pub struct HashWriter<W> {
    inner: W,
    hasher: Hasher,
}

impl<W: Write> HashWriter<W> {
    pub fn new(inner: W) -> Self {
        HashWriter {
            inner,
            hasher: Hasher::new(),
        }
    }

    /// Finalizes the hash state and returns the computed digest and the
    /// underlying writer.
    pub fn finish(self) -> (Digest, W) {
        (self.hasher.finish(), self.inner)
    }
}

impl<W: Write> Write for HashWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let len = self.inner.write(buf)?;
        self.hasher.update(&buf[0..len]);
        Ok(len)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "./encoding_test.rs"]
mod encoding_test;
