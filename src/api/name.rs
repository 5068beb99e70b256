use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;

use crate::{Error, Result};

/// The validated name of a package.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PkgName(SmolStr);

impl PkgName {
    /// Parses a package name from the string.
    ///
    /// Names are made of ascii letters, digits, `-` and `_`, and must
    /// start with a letter.
    pub fn parse<S: AsRef<str>>(s: S) -> Result<Self> {
        let name = s.as_ref();
        if name.is_empty() {
            return Err(Error::InvalidName("name cannot be empty".to_string()));
        }
        let leading_alpha = name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false);
        if !leading_alpha {
            return Err(Error::InvalidName(format!(
                "name must start with a letter: {:?}",
                name
            )));
        }
        if !name.chars().all(is_name_char) {
            return Err(Error::InvalidName(format!(
                "name contains invalid characters: {:?}",
                name
            )));
        }
        Ok(PkgName(SmolStr::new(name)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl AsRef<str> for PkgName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PkgName {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PkgName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PkgName::parse(s)
    }
}

impl<'de> Deserialize<'de> for PkgName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PkgName::parse(s).map_err(de::Error::custom)
    }
}
