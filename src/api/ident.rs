use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::{parse_build, parse_version, Build, PkgName, Version};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./ident_test.rs"]
mod ident_test;

/// A package identifier: `NAME[/VERSION[/BUILD]]`.
///
/// Depending on context, an identifier names a specific package build or
/// a version of a package with no particular build.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Ident {
    pub name: PkgName,
    pub version: Version,
    pub build: Option<Build>,
}

impl Ident {
    pub fn new(name: PkgName) -> Self {
        Ident {
            name,
            version: Version::default(),
            build: None,
        }
    }

    pub fn with_version(name: PkgName, version: Version) -> Self {
        Ident {
            name,
            version,
            build: None,
        }
    }

    /// Return a copy of this identifier with the given build replaced.
    pub fn with_build(&self, build: Option<Build>) -> Self {
        Ident {
            name: self.name.clone(),
            version: self.version.clone(),
            build,
        }
    }

    /// True if this identifier names a source package build.
    pub fn is_source(&self) -> bool {
        matches!(self.build, Some(Build::Source))
    }
}

/// Parse a package identifier string.
pub fn parse_ident<S: AsRef<str>>(source: S) -> Result<Ident> {
    let source = source.as_ref();
    let mut tokens = source.split('/');
    let name = tokens
        .next()
        .map(PkgName::parse)
        .unwrap_or_else(|| Err(Error::InvalidIdent(source.to_string())))?;
    let version = match tokens.next() {
        Some(token) => parse_version(token)?,
        None => Version::default(),
    };
    let build = match tokens.next() {
        Some("") | None => None,
        Some(token) => Some(parse_build(token)?),
    };
    if tokens.next().is_some() {
        return Err(Error::InvalidIdent(format!(
            "too many tokens in identifier: {}",
            source
        )));
    }
    Ok(Ident {
        name,
        version,
        build,
    })
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.name.fmt(f)?;
        if !self.version.is_empty() || self.build.is_some() {
            f.write_str("/")?;
            self.version.fmt(f)?;
        }
        if let Some(build) = &self.build {
            f.write_str("/")?;
            build.fmt(f)?;
        }
        Ok(())
    }
}

impl FromStr for Ident {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_ident(s)
    }
}

impl Serialize for Ident {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_ident(s).map_err(de::Error::custom)
    }
}
