//! Repository storage: packages, platforms, runtimes and tag refs.

pub use self::blob::BlobStorage;
pub use self::layer::{Layer, LayerStorage};
pub use self::platform::{Platform, PlatformStorage};
pub use self::runtime::{Runtime, RuntimeConfig, RuntimeStorage};

use std::fs::File;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::encoding::Digest;
use crate::tracking::Manifest;
use crate::{Error, Result};

mod blob;
mod layer;
mod platform;
mod runtime;

#[cfg(test)]
#[path = "./storage_test.rs"]
mod storage_test;

const PACK_DIR: &str = "pack";
const PACK_META_DIR: &str = "pack/meta";
const PLAT_DIR: &str = "plat";
const RUN_DIR: &str = "run";
const TAGS_DIR: &str = "tags";

/// Any object that can be read out of a repository by ref.
#[derive(Clone, Debug)]
pub enum Object {
    Layer(Layer),
    Platform(Platform),
    Runtime(Runtime),
}

impl Object {
    /// The content digest of this object.
    ///
    /// Runtimes are not content-addressed and cannot provide one.
    pub fn digest(&self) -> Result<Digest> {
        match self {
            Object::Layer(layer) => Ok(layer.digest()),
            Object::Platform(platform) => Ok(platform.digest()),
            Object::Runtime(runtime) => Err(Error::new(format!(
                "runtime {} is not content-addressed",
                runtime.id
            ))),
        }
    }

    pub fn into_layer(self) -> Result<Layer> {
        match self {
            Object::Layer(layer) => Ok(layer),
            other => Err(Error::new(format!("not a layer: {:?}", other))),
        }
    }

    pub fn into_platform(self) -> Result<Platform> {
        match self {
            Object::Platform(platform) => Ok(platform),
            other => Err(Error::new(format!("not a platform: {:?}", other))),
        }
    }
}

/// A storage location for layered file system data.
#[derive(Clone, Debug)]
pub struct Repository {
    root: PathBuf,
    /// Blob payloads and manifest renders, under `pack/`.
    pub packages: BlobStorage,
    /// Layer records, under `pack/meta/`.
    pub layers: LayerStorage,
    /// Platform records, under `plat/`.
    pub platforms: PlatformStorage,
    /// Runtime working directories, under `run/`.
    pub runtimes: RuntimeStorage,
}

impl Repository {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Repository {
            packages: BlobStorage::new(root.join(PACK_DIR)),
            layers: LayerStorage::new(root.join(PACK_META_DIR)),
            platforms: PlatformStorage::new(root.join(PLAT_DIR)),
            runtimes: RuntimeStorage::new(root.join(RUN_DIR)),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tags_root(&self) -> PathBuf {
        self.root.join(TAGS_DIR)
    }

    /// Read an object of unknown type by tag or digest.
    ///
    /// Tag indirection is attempted first, then the ref is tried as a
    /// package layer, a platform, and a runtime id, in that order.
    pub fn read_ref<S: AsRef<str>>(&self, reference: S) -> Result<Object> {
        let reference = reference.as_ref();
        let mut resolved = reference.to_string();
        match std::fs::read_to_string(self.tags_root().join(reference)) {
            Ok(content) => resolved = content.trim().to_string(),
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Ok(digest) = resolved.parse::<Digest>() {
            if let Ok(layer) = self.layers.read_layer(&digest) {
                return Ok(Object::Layer(layer));
            }
            if let Ok(platform) = self.platforms.read_platform(&digest) {
                return Ok(Object::Platform(platform));
            }
        }
        if let Ok(runtime) = self.runtimes.read_runtime(&resolved) {
            return Ok(Object::Runtime(runtime));
        }

        Err(Error::UnknownReference(reference.to_string()))
    }

    pub fn has_ref<S: AsRef<str>>(&self, reference: S) -> bool {
        self.read_ref(reference).is_ok()
    }

    /// Tag the object identified by `reference` under a new name.
    pub fn tag<R: AsRef<str>, T: AsRef<str>>(&self, reference: R, tag: T) -> Result<()> {
        let digest = self.read_ref(reference)?.digest()?;
        self.push_tag(tag.as_ref(), &digest)
    }

    /// Write or retarget the given tag file atomically.
    pub fn push_tag(&self, tag: &str, digest: &Digest) -> Result<()> {
        use std::io::Write;
        let linkfile = self.tags_root().join(tag);
        let parent = linkfile
            .parent()
            .ok_or_else(|| Error::new("tag path must have a parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        writeln!(temp, "{}", digest)?;
        temp.persist(&linkfile).map_err(|e| e.error)?;
        Ok(())
    }

    /// Walk all tags in this repository, yielding each tag name and the
    /// digest it points to.
    pub fn iter_tags(&self) -> Result<Vec<(String, Digest)>> {
        let tags_root = self.tags_root();
        let mut tags = Vec::new();
        if !tags_root.is_dir() {
            return Ok(tags);
        }
        for entry in walkdir::WalkDir::new(&tags_root) {
            let entry = entry.map_err(|e| Error::new(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let content = std::fs::read_to_string(entry.path())?;
            let digest = content.trim().parse::<Digest>()?;
            let tag = entry
                .path()
                .strip_prefix(&tags_root)
                .map_err(|e| Error::new(e.to_string()))?
                .to_string_lossy()
                .to_string();
            tags.push((tag, digest));
        }
        Ok(tags)
    }

    /// Return all tags that point at the same object as `reference`.
    pub fn find_aliases<S: AsRef<str>>(&self, reference: S) -> Result<Vec<String>> {
        let digest = self.read_ref(reference)?.digest()?;
        let mut aliases = Vec::new();
        for (tag, target) in self.iter_tags()? {
            if target == digest {
                aliases.push(tag);
            }
        }
        Ok(aliases)
    }

    /// Commit the working file changes of a runtime to a new package layer.
    pub fn commit_package(&self, runtime: &Runtime, env: Vec<(String, String)>) -> Result<Layer> {
        let manifest = self.packages.commit_dir(runtime.upperdir())?;
        let layer = Layer::with_env(manifest, env);
        self.layers.write_layer(&layer)?;
        Ok(layer)
    }

    /// Commit the full layer stack and working files to a new platform.
    pub fn commit_platform(
        &self,
        runtime: &mut Runtime,
        env: Vec<(String, String)>,
    ) -> Result<Platform> {
        let top = self.commit_package(runtime, env)?;
        runtime.append_layer(top.digest().to_string())?;

        let mut stack = Vec::new();
        for reference in &runtime.config.layers {
            match self.read_ref(reference)? {
                Object::Layer(layer) => stack.push(layer.digest()),
                Object::Platform(platform) => stack.extend(platform.stack),
                Object::Runtime(_) => {
                    return Err(Error::new(format!(
                        "runtime {} cannot appear in a layer stack",
                        reference
                    )))
                }
            }
        }
        let platform = Platform::new(stack);
        self.platforms.write_platform(&platform)?;
        Ok(platform)
    }

    // Delegates used by the sync and resolve flows.

    pub fn has_blob(&self, digest: &Digest) -> bool {
        self.packages.has_blob(digest)
    }

    pub fn open_blob(&self, digest: &Digest) -> Result<File> {
        self.packages.open_blob(digest)
    }

    pub fn write_blob<R: Read>(&self, data: R) -> Result<Digest> {
        self.packages.write_blob(data)
    }

    pub fn has_layer(&self, digest: &Digest) -> bool {
        self.layers.has_layer(digest)
    }

    pub fn write_layer(&self, layer: &Layer) -> Result<Digest> {
        self.layers.write_layer(layer)
    }

    pub fn has_platform(&self, digest: &Digest) -> bool {
        self.platforms.has_platform(digest)
    }

    pub fn write_platform(&self, platform: &Platform) -> Result<Digest> {
        self.platforms.write_platform(platform)
    }

    pub fn render_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        self.packages.render_manifest(manifest)
    }
}

/// Create the repository directory structure at `path` if it does not
/// already exist, and open it.
pub fn ensure_repository<P: Into<PathBuf>>(path: P) -> Result<Repository> {
    let root = path.into();
    for subdir in &[PACK_DIR, PACK_META_DIR, PLAT_DIR, RUN_DIR, TAGS_DIR] {
        let dir = root.join(subdir);
        std::fs::create_dir_all(&dir)?;
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o777))?;
    }
    std::fs::create_dir_all(root.join(PACK_DIR).join("renders"))?;
    Ok(Repository::new(root))
}
