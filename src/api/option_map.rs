use std::collections::BTreeMap;
use std::iter::FromIterator;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use super::build::{digest_from_bytes, Build};
use crate::encoding::Hasher;

/// A map of build-time variables and their values.
///
/// Entries are kept in sorted key order, giving the map a canonical
/// serialization and a stable digest.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct OptionMap(BTreeMap<String, String>);

impl OptionMap {
    /// The build digest identifying this exact set of options.
    pub fn digest(&self) -> Build {
        let mut hasher = Hasher::new();
        for (name, value) in &self.0 {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        let digest = hasher.finish();
        Build::Digest(digest_from_bytes(digest.as_bytes()))
    }
}

impl Deref for OptionMap {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for OptionMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, String)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        OptionMap(iter.into_iter().collect())
    }
}

impl IntoIterator for OptionMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
