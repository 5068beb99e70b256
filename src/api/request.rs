use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::{parse_build, parse_version, Build, Compatibility, Ident, PkgName, Version};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./request_test.rs"]
mod request_test;

/// A single rule restricting acceptable versions.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum VersionConstraint {
    /// Bare version: accepted versions must start with these parts.
    Prefix(Version),
    LessThan(Version),
    LessThanOrEqualTo(Version),
    GreaterThan(Version),
    GreaterThanOrEqualTo(Version),
    Exactly(Version),
    NotEqualTo(Version),
}

impl VersionConstraint {
    /// Check whether the given version is allowed by this rule.
    pub fn is_applicable(&self, version: &Version) -> Compatibility {
        let ok = match self {
            VersionConstraint::Prefix(base) => version.starts_with(base),
            VersionConstraint::LessThan(base) => version < base,
            VersionConstraint::LessThanOrEqualTo(base) => version <= base,
            VersionConstraint::GreaterThan(base) => version > base,
            VersionConstraint::GreaterThanOrEqualTo(base) => version >= base,
            VersionConstraint::Exactly(base) => version == base,
            VersionConstraint::NotEqualTo(base) => version != base,
        };
        if ok {
            Compatibility::Compatible
        } else {
            Compatibility::incompatible(format!("version {} not allowed by {}", version, self))
        }
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            VersionConstraint::Prefix(base) => base.fmt(f),
            VersionConstraint::LessThan(base) => write!(f, "<{}", base),
            VersionConstraint::LessThanOrEqualTo(base) => write!(f, "<={}", base),
            VersionConstraint::GreaterThan(base) => write!(f, ">{}", base),
            VersionConstraint::GreaterThanOrEqualTo(base) => write!(f, ">={}", base),
            VersionConstraint::Exactly(base) => write!(f, "={}", base),
            VersionConstraint::NotEqualTo(base) => write!(f, "!={}", base),
        }
    }
}

/// A set of version rules, all of which must hold.
///
/// An empty filter places no restriction at all.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct VersionFilter {
    rules: BTreeSet<VersionConstraint>,
}

impl VersionFilter {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether the given version satisfies every rule in the filter.
    pub fn is_applicable(&self, version: &Version) -> Compatibility {
        for rule in &self.rules {
            let compat = rule.is_applicable(version);
            if !compat.is_ok() {
                return compat;
            }
        }
        Compatibility::Compatible
    }

    /// Narrow this filter to also require all of `other`'s rules.
    pub fn restrict(&mut self, other: &VersionFilter) {
        self.rules.extend(other.rules.iter().cloned());
    }
}

/// Parse a comma-separated list of version rules.
pub fn parse_version_filter<S: AsRef<str>>(source: S) -> Result<VersionFilter> {
    let source = source.as_ref();
    let mut rules = BTreeSet::new();
    for rule in source.split(',') {
        let rule = rule.trim();
        if rule.is_empty() {
            continue;
        }
        let parsed = if let Some(rest) = rule.strip_prefix("<=") {
            VersionConstraint::LessThanOrEqualTo(parse_version(rest)?)
        } else if let Some(rest) = rule.strip_prefix(">=") {
            VersionConstraint::GreaterThanOrEqualTo(parse_version(rest)?)
        } else if let Some(rest) = rule.strip_prefix("!=") {
            VersionConstraint::NotEqualTo(parse_version(rest)?)
        } else if let Some(rest) = rule.strip_prefix('<') {
            VersionConstraint::LessThan(parse_version(rest)?)
        } else if let Some(rest) = rule.strip_prefix('>') {
            VersionConstraint::GreaterThan(parse_version(rest)?)
        } else if let Some(rest) = rule.strip_prefix('=') {
            VersionConstraint::Exactly(parse_version(rest)?)
        } else {
            VersionConstraint::Prefix(parse_version(rule)?)
        };
        rules.insert(parsed);
    }
    Ok(VersionFilter { rules })
}

impl Display for VersionFilter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let rendered = self
            .rules
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&rendered)
    }
}

impl FromStr for VersionFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_version_filter(s)
    }
}

/// A package identifier with a version range in place of a version:
/// `NAME[/VERSION_FILTER[/BUILD]]`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RangeIdent {
    pub name: PkgName,
    pub version: VersionFilter,
    pub build: Option<Build>,
}

impl RangeIdent {
    pub fn parse<S: AsRef<str>>(source: S) -> Result<Self> {
        let source = source.as_ref();
        let mut tokens = source.split('/');
        let name = tokens
            .next()
            .map(PkgName::parse)
            .unwrap_or_else(|| Err(Error::InvalidIdent(source.to_string())))?;
        let version = match tokens.next() {
            Some(token) => parse_version_filter(token)?,
            None => VersionFilter::default(),
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
        Ok(RangeIdent {
            name,
            version,
            build,
        })
    }

    /// True if this ident requests a source build specifically.
    pub fn is_source(&self) -> bool {
        matches!(self.build, Some(Build::Source))
    }

    /// Check whether the given concrete identifier satisfies this range.
    pub fn is_applicable(&self, pkg: &Ident) -> Compatibility {
        if self.name != pkg.name {
            return Compatibility::incompatible(format!(
                "different package name: {} != {}",
                self.name, pkg.name
            ));
        }
        let compat = self.version.is_applicable(&pkg.version);
        if !compat.is_ok() {
            return compat;
        }
        if let Some(build) = &self.build {
            if Some(build) != pkg.build.as_ref() {
                return Compatibility::incompatible(format!(
                    "requested build {} does not match {}",
                    build,
                    pkg.build.as_ref().map(ToString::to_string).unwrap_or_default()
                ));
            }
        }
        Compatibility::Compatible
    }
}

impl Display for RangeIdent {
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

impl FromStr for RangeIdent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RangeIdent::parse(s)
    }
}

impl Serialize for RangeIdent {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RangeIdent {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RangeIdent::parse(s).map_err(de::Error::custom)
    }
}

/// A request for a package within a version range.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PkgRequest {
    pub pkg: RangeIdent,
}

impl PkgRequest {
    pub fn new(pkg: RangeIdent) -> Self {
        PkgRequest { pkg }
    }

    pub fn from_ident(pkg: &Ident) -> Self {
        let mut version = VersionFilter::default();
        if !pkg.version.is_empty() {
            version
                .rules
                .insert(VersionConstraint::Prefix(pkg.version.clone()));
        }
        PkgRequest {
            pkg: RangeIdent {
                name: pkg.name.clone(),
                version,
                build: pkg.build.clone(),
            },
        }
    }

    pub fn parse<S: AsRef<str>>(source: S) -> Result<Self> {
        Ok(PkgRequest {
            pkg: RangeIdent::parse(source)?,
        })
    }

    /// Merge the constraints of another request into this one.
    pub fn restrict(&mut self, other: &PkgRequest) {
        self.pkg.version.restrict(&other.pkg.version);
        if self.pkg.build.is_none() {
            self.pkg.build = other.pkg.build.clone();
        }
    }

    /// Check whether the given concrete identifier satisfies this request.
    pub fn is_satisfied_by(&self, pkg: &Ident) -> Compatibility {
        self.pkg.is_applicable(pkg)
    }
}

impl Display for PkgRequest {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.pkg.fmt(f)
    }
}

/// A request that constrains a build-time variable.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct VarRequest {
    pub var: String,
    pub value: String,
}

impl VarRequest {
    pub fn new<S: Into<String>, V: Into<String>>(var: S, value: V) -> Self {
        VarRequest {
            var: var.into(),
            value: value.into(),
        }
    }
}

/// Any solvable request.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Request {
    Pkg(PkgRequest),
    Var(VarRequest),
}

impl FromStr for Request {
    type Err = Error;

    /// An identifier string parses as a package request.
    fn from_str(s: &str) -> Result<Self> {
        Ok(Request::Pkg(PkgRequest::parse(s)?))
    }
}

impl From<PkgRequest> for Request {
    fn from(request: PkgRequest) -> Self {
        Request::Pkg(request)
    }
}

impl From<VarRequest> for Request {
    fn from(request: VarRequest) -> Self {
        Request::Var(request)
    }
}
