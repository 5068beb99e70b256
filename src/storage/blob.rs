use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::encoding::{Digest, Hasher};
use crate::tracking::{compute_manifest, Manifest};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./blob_test.rs"]
mod blob_test;

const CHUNK_SIZE: usize = 1024;
const RENDERS_SUBDIR: &str = "renders";
const COMPLETED_MARKER: &str = ".completed";

/// Local file system storage of arbitrary binary data.
///
/// Also maintains hard-linked renders of file manifests for use in
/// local runtimes.
#[derive(Clone, Debug)]
pub struct BlobStorage {
    root: PathBuf,
    renders: PathBuf,
    /// Permission bits applied to stored blob files.
    ///
    /// The open default suits shared repositories: with protected hardlinks
    /// enabled, a renderer must either own a file or have rwx access to it
    /// in order to link it. Lock this down when the storage has one owner.
    pub blob_permissions: u32,
}

impl BlobStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let renders = root.join(RENDERS_SUBDIR);
        BlobStorage {
            root,
            renders,
            blob_permissions: 0o777,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The storage path of the blob with the given digest.
    pub fn build_digest_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.to_path_buf())
    }

    /// The path of the rendered manifest with the given digest.
    pub fn build_render_path(&self, digest: &Digest) -> PathBuf {
        self.renders.join(digest.to_path_buf())
    }

    pub fn has_blob(&self, digest: &Digest) -> bool {
        self.build_digest_path(digest).is_file()
    }

    /// Return a handle to the blob identified by the given digest.
    pub fn open_blob(&self, digest: &Digest) -> Result<std::fs::File> {
        match std::fs::File::open(self.build_digest_path(digest)) {
            Ok(file) => Ok(file),
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::UnknownObject(*digest))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read the given data stream to completion, and store as a blob.
    ///
    /// The data is hashed while it is written to a uniquely named working
    /// file, which only becomes addressable under its digest once the
    /// final rename lands. Concurrent writers of the same content are safe
    /// and leave a single stored copy.
    pub fn write_blob<R: Read>(&self, mut data: R) -> Result<Digest> {
        let mut working_file = tempfile::Builder::new()
            .prefix("work-")
            .tempfile_in(&self.root)?;

        let mut hasher = Hasher::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match data.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&chunk[..n]);
                    working_file.write_all(&chunk[..n])?;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        working_file.flush()?;

        let digest = hasher.finish();
        let final_filepath = self.build_digest_path(&digest);
        if final_filepath.is_file() {
            // working file is dropped and removed
            tracing::debug!(%digest, "blob already exists");
            return Ok(digest);
        }

        ensure_base_dir(&final_filepath)?;
        let perms = std::fs::Permissions::from_mode(self.blob_permissions);
        working_file.as_file().set_permissions(perms)?;
        match working_file.persist(&final_filepath) {
            Ok(_) => Ok(digest),
            Err(_) if final_filepath.is_file() => Ok(digest),
            Err(e) => Err(e.error.into()),
        }
    }

    /// Create a hard-linked rendering of the given file manifest.
    ///
    /// Rendering is idempotent: a completed render is detected by its
    /// sentinel marker and returned as-is. Returns `Err` if any blob in the
    /// manifest is not available in this storage.
    pub fn render_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        let digest = manifest.digest();
        let rendered_dirpath = self.build_render_path(&digest);
        if was_render_completed(&rendered_dirpath) {
            return Ok(rendered_dirpath);
        }

        ensure_base_dir(&rendered_dirpath)?;
        if let Err(e) = std::fs::create_dir(&rendered_dirpath) {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                return Err(e.into());
            }
        }

        let nodes: Vec<_> = manifest.walk_abs(&rendered_dirpath).collect();
        for node in &nodes {
            if node.entry.kind.is_tree() {
                std::fs::create_dir_all(&node.path)?;
            } else if node.entry.kind.is_mask() {
                continue;
            } else if node.entry.is_symlink() {
                let mut target = String::new();
                self.open_blob(&node.entry.object)?
                    .read_to_string(&mut target)?;
                if let Err(e) = std::os::unix::fs::symlink(&target, &node.path) {
                    if e.kind() != std::io::ErrorKind::AlreadyExists {
                        return Err(e.into());
                    }
                }
            } else {
                let committed_path = self.build_digest_path(&node.entry.object);
                if let Err(e) = std::fs::hard_link(&committed_path, &node.path) {
                    match e.kind() {
                        std::io::ErrorKind::AlreadyExists => {}
                        std::io::ErrorKind::NotFound => {
                            return Err(Error::UnknownObject(node.entry.object))
                        }
                        _ => return Err(e.into()),
                    }
                }
            }
        }

        // Permissions are applied bottom-up so that a read-only directory
        // is not locked before its children have been created.
        for node in nodes.iter().rev() {
            if node.entry.kind.is_mask() || node.entry.is_symlink() {
                continue;
            }
            let perms = std::fs::Permissions::from_mode(node.entry.mode & 0o7777);
            std::fs::set_permissions(&node.path, perms)?;
        }

        mark_render_completed(&rendered_dirpath)?;
        Ok(rendered_dirpath)
    }

    /// Commit a local file system directory to this storage.
    ///
    /// This collects all files to store as blobs and maintains a render
    /// of the manifest for use immediately.
    pub fn commit_dir<P: AsRef<Path>>(&self, dirname: P) -> Result<Manifest> {
        let working_dirpath = self.root.join(format!("work-{}", uuid::Uuid::new_v4().simple()));

        tracing::info!("computing file manifest");
        let manifest = compute_manifest(dirname.as_ref())?;

        tracing::info!("copying file tree");
        copy_manifest(&manifest, dirname.as_ref(), &working_dirpath)?;

        tracing::info!("committing file manifest");
        for node in manifest.walk_abs(&working_dirpath) {
            if node.entry.kind.is_tree() || node.entry.kind.is_mask() {
                continue;
            }

            if node.entry.is_symlink() {
                let target = std::fs::read_link(&node.path)?;
                let data = target
                    .to_str()
                    .ok_or_else(|| Error::new("symlinks must point to a valid utf-8 path"))?
                    .as_bytes()
                    .to_vec();
                let digest = self.write_blob(std::io::Cursor::new(data))?;
                if digest != node.entry.object {
                    return Err(Error::DigestMismatch {
                        expected: node.entry.object,
                        actual: digest,
                    });
                }
                continue;
            }

            let committed_path = self.build_digest_path(&node.entry.object);
            if committed_path.is_file() {
                tracing::debug!(digest = %node.entry.object, "file exists");
                std::fs::remove_file(&node.path)?;
                continue;
            }
            ensure_base_dir(&committed_path)?;
            match std::fs::rename(&node.path, &committed_path) {
                Ok(()) => {
                    let perms = std::fs::Permissions::from_mode(self.blob_permissions);
                    std::fs::set_permissions(&committed_path, perms)?;
                }
                Err(_) if committed_path.is_file() => {
                    std::fs::remove_file(&node.path)?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!("committing rendered manifest");
        let rendered_dirpath = self.build_render_path(&manifest.digest());
        ensure_base_dir(&rendered_dirpath)?;
        match std::fs::rename(&working_dirpath, &rendered_dirpath) {
            Ok(()) => {}
            Err(_) if rendered_dirpath.is_dir() => {
                std::fs::remove_dir_all(&working_dirpath)?;
            }
            Err(e) => return Err(e.into()),
        }

        // The commit process can leave files missing or with wrong
        // permissions, so the render is traversed and validated to
        // completion.
        self.render_manifest(&manifest)?;

        Ok(manifest)
    }
}

/// Copy manifest contents from one directory to another, skipping masked
/// entries and anything beneath them.
fn copy_manifest(manifest: &Manifest, src_root: &Path, dst_root: &Path) -> Result<()> {
    std::fs::create_dir_all(dst_root)?;
    for node in manifest.walk() {
        let relative = node
            .path
            .strip_prefix("/")
            .unwrap_or(&node.path)
            .to_path_buf();
        let src = src_root.join(&relative);
        let dst = dst_root.join(&relative);
        if node.entry.kind.is_mask() {
            continue;
        } else if node.entry.kind.is_tree() {
            std::fs::create_dir_all(&dst)?;
        } else if node.entry.is_symlink() {
            let target = std::fs::read_link(&src)?;
            std::os::unix::fs::symlink(&target, &dst)?;
        } else {
            std::fs::copy(&src, &dst)?;
        }
    }
    Ok(())
}

fn ensure_base_dir(path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::new("storage path must have a parent directory"))?;
    std::fs::create_dir_all(parent)?;
    Ok(())
}

fn was_render_completed(render_path: &Path) -> bool {
    completed_marker_path(render_path).exists()
}

fn mark_render_completed(render_path: &Path) -> Result<()> {
    std::fs::File::create(completed_marker_path(render_path))?;
    Ok(())
}

fn completed_marker_path(render_path: &Path) -> PathBuf {
    let mut name = render_path
        .file_name()
        .unwrap_or_default()
        .to_os_string();
    name.push(COMPLETED_MARKER);
    render_path.with_file_name(name)
}
