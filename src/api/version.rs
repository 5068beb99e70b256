use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./version_test.rs"]
mod version_test;

/// A package version number: one or more dot-separated numeric parts.
///
/// The empty version (no parts) denotes "any/unspecified" and sorts
/// before every concrete version.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Version {
    pub parts: Vec<u32>,
}

impl Version {
    pub fn new(parts: Vec<u32>) -> Self {
        Version { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// True if this version starts with all the parts of `base`.
    ///
    /// Used for bare-version requests, where `2.7` accepts any `2.7.x`.
    pub fn starts_with(&self, base: &Version) -> bool {
        if base.parts.len() > self.parts.len() {
            return false;
        }
        self.parts[..base.parts.len()] == base.parts[..]
    }
}

/// Parse a version number from the given string.
pub fn parse_version<S: AsRef<str>>(source: S) -> Result<Version> {
    let source = source.as_ref();
    if source.is_empty() {
        return Ok(Version::default());
    }
    let mut parts = Vec::new();
    for token in source.split('.') {
        let part = token
            .parse::<u32>()
            .map_err(|_| Error::InvalidVersion(source.to_string()))?;
        parts.push(part);
    }
    Ok(Version { parts })
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let rendered = self
            .parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&rendered)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_version(s)
    }
}

impl Ord for Version {
    /// Versions compare part-by-part with missing parts reading as zero;
    /// when equal that way, the version with more explicit parts is the
    /// greater (`1.0 < 1.0.0`), keeping the ordering consistent with
    /// equality.
    fn cmp(&self, other: &Self) -> Ordering {
        let count = self.parts.len().max(other.parts.len());
        for i in 0..count {
            let mine = self.parts.get(i).copied().unwrap_or(0);
            let theirs = other.parts.get(i).copied().unwrap_or(0);
            match mine.cmp(&theirs) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        self.parts.len().cmp(&other.parts.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_version(s).map_err(de::Error::custom)
    }
}
