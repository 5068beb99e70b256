use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::encoding::{Digest, Hasher};
use crate::tracking::Manifest;
use crate::{Error, Result};

/// A package layer: a file manifest plus an environment overlay.
///
/// Layers are immutable once written and identified by a digest derived
/// from the manifest digest and the serialized environment.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Layer {
    pub manifest: Manifest,
    /// Ordered environment entries contributed by this layer.
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl Layer {
    pub fn new(manifest: Manifest) -> Self {
        Layer {
            manifest,
            env: Vec::new(),
        }
    }

    pub fn with_env(manifest: Manifest, env: Vec<(String, String)>) -> Self {
        Layer { manifest, env }
    }

    pub fn digest(&self) -> Digest {
        let mut hasher = Hasher::new();
        hasher.update(self.manifest.digest().as_bytes());
        for (name, value) in &self.env {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finish()
    }

    pub fn iter_env(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Filesystem storage of layer records.
#[derive(Clone, Debug)]
pub struct LayerStorage {
    root: PathBuf,
}

impl LayerStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        LayerStorage { root: root.into() }
    }

    fn build_digest_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.to_path_buf())
    }

    pub fn has_layer(&self, digest: &Digest) -> bool {
        self.build_digest_path(digest).is_file()
    }

    pub fn read_layer(&self, digest: &Digest) -> Result<Layer> {
        let path = self.build_digest_path(digest);
        match std::fs::File::open(&path) {
            Ok(file) => Ok(serde_json::from_reader(file)?),
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::UnknownObject(*digest))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the given layer record, returning its digest.
    ///
    /// Existing records are left untouched; identical content always
    /// serializes to an identical record.
    pub fn write_layer(&self, layer: &Layer) -> Result<Digest> {
        let digest = layer.digest();
        let path = self.build_digest_path(&digest);
        if !path.is_file() {
            persist_json(layer, &path, &self.root)?;
        }
        Ok(digest)
    }
}

/// Persist `val` to disk as a JSON file located at `dest`.
///
/// The record is staged under a unique temporary name and moved into
/// place, so partially written records are never visible.
pub(crate) fn persist_json<T: Serialize>(val: &T, dest: &Path, tmp_dir: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut temp = tempfile::NamedTempFile::new_in(tmp_dir)?;
    serde_json::to_writer(&mut temp, val)?;
    match temp.persist(dest) {
        Ok(_) => Ok(()),
        Err(_) if dest.is_file() => Ok(()),
        Err(e) => Err(e.error.into()),
    }
}
