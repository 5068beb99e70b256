use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./build_test.rs"]
mod build_test;

/// Token identifying a source build.
pub const SRC: &str = "src";

/// Number of characters in a build digest.
pub const DIGEST_SIZE: usize = 8;

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// The build component of a package identifier.
///
/// A package version is either buildable from source or available as one
/// or more binary builds, each identified by the digest of the options
/// it was built with.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Build {
    Source,
    Digest(String),
}

impl Build {
    pub fn is_source(&self) -> bool {
        matches!(self, Build::Source)
    }

    pub fn digest(&self) -> &str {
        match self {
            Build::Source => SRC,
            Build::Digest(digest) => digest,
        }
    }
}

/// Parse the given string as a build identifier.
pub fn parse_build<S: AsRef<str>>(source: S) -> Result<Build> {
    let source = source.as_ref();
    if source == SRC {
        return Ok(Build::Source);
    }
    if source.len() != DIGEST_SIZE
        || !source.bytes().all(|c| BASE32_ALPHABET.contains(&c))
    {
        return Err(Error::InvalidBuild(source.to_string()));
    }
    Ok(Build::Digest(source.to_string()))
}

/// Encode the first bytes of `data` as a build digest string.
///
/// Five input bytes map exactly onto the eight base32 characters of a
/// build digest.
pub(crate) fn digest_from_bytes(data: &[u8]) -> String {
    let mut bits = 0u64;
    for byte in &data[..5] {
        bits = (bits << 8) | u64::from(*byte);
    }
    let mut out = String::with_capacity(DIGEST_SIZE);
    for i in (0..DIGEST_SIZE).rev() {
        let index = ((bits >> (i * 5)) & 0x1f) as usize;
        out.push(BASE32_ALPHABET[index] as char);
    }
    out
}

impl Display for Build {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.digest())
    }
}

impl FromStr for Build {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_build(s)
    }
}

impl Serialize for Build {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Build {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_build(s).map_err(de::Error::custom)
    }
}
