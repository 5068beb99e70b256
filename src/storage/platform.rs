use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::layer::persist_json;
use crate::encoding::{Digest, Hasher};
use crate::{Error, Result};

/// An ordered stack of layers, bottom to top.
///
/// Later layers override earlier ones on path conflicts under the union
/// mount. Platforms are immutable and identified by the hash of their
/// stack.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Platform {
    pub stack: Vec<Digest>,
}

impl Platform {
    pub fn new(stack: Vec<Digest>) -> Self {
        Platform { stack }
    }

    pub fn digest(&self) -> Digest {
        let mut hasher = Hasher::new();
        for layer in &self.stack {
            hasher.update(layer.as_bytes());
        }
        hasher.finish()
    }
}

/// Filesystem storage of platform records.
#[derive(Clone, Debug)]
pub struct PlatformStorage {
    root: PathBuf,
}

impl PlatformStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        PlatformStorage { root: root.into() }
    }

    fn build_digest_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.to_path_buf())
    }

    pub fn has_platform(&self, digest: &Digest) -> bool {
        self.build_digest_path(digest).is_file()
    }

    pub fn read_platform(&self, digest: &Digest) -> Result<Platform> {
        let path = self.build_digest_path(digest);
        match std::fs::File::open(&path) {
            Ok(file) => Ok(serde_json::from_reader(file)?),
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::UnknownObject(*digest))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn write_platform(&self, platform: &Platform) -> Result<Digest> {
        let digest = platform.digest();
        let path = self.build_digest_path(&digest);
        if !path.is_file() {
            persist_json(platform, &path, &self.root)?;
        }
        Ok(digest)
    }
}
