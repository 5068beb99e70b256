use std::collections::btree_map;
use std::io::Read;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Entry, EntryKind};
use crate::encoding::{Hasher, NULL_DIGEST};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./manifest_test.rs"]
mod manifest_test;

/// A manifest holds the state of a whole file tree.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Manifest {
    root: Entry,
}

impl Manifest {
    pub fn new(root: Entry) -> Self {
        Manifest { root }
    }

    pub fn root(&self) -> &Entry {
        &self.root
    }

    /// Return true if this manifest has no contents.
    pub fn is_empty(&self) -> bool {
        self.root.entries.is_empty()
    }

    /// The digest of this manifest, which identifies its whole content tree.
    pub fn digest(&self) -> crate::encoding::Digest {
        self.root.digest()
    }

    /// Get an entry in this manifest given its file path.
    pub fn get_path<P: AsRef<str>>(&self, path: P) -> Option<&Entry> {
        const TRIM_START: &[char] = &['/', '.'];
        const TRIM_END: &[char] = &['/'];
        let path = path
            .as_ref()
            .trim_start_matches(TRIM_START)
            .trim_end_matches(TRIM_END);
        let mut entry = &self.root;
        if path.is_empty() {
            return Some(entry);
        }
        for step in path.split('/') {
            if !entry.kind.is_tree() {
                return None;
            }
            entry = entry.entries.get(step)?;
        }
        Some(entry)
    }

    /// Walk the contents of this manifest depth-first in pre-order.
    ///
    /// Entries within a directory are visited in sorted name order, so the
    /// walk order is stable for a given content tree.
    pub fn walk(&self) -> ManifestWalker<'_> {
        ManifestWalker::new(&self.root)
    }

    /// Same as `walk()`, but joins all entry paths to the given root.
    pub fn walk_abs<P: Into<PathBuf>>(&self, root: P) -> ManifestWalker<'_> {
        self.walk().with_prefix(root)
    }
}

/// Walks all entries in a manifest depth-first in pre-order.
pub struct ManifestWalker<'m> {
    prefix: PathBuf,
    children: btree_map::Iter<'m, String, Entry>,
    active_child: Option<Box<ManifestWalker<'m>>>,
}

impl<'m> ManifestWalker<'m> {
    fn new(root: &'m Entry) -> Self {
        ManifestWalker {
            prefix: PathBuf::from("/"),
            children: root.entries.iter(),
            active_child: None,
        }
    }

    fn with_prefix<P: Into<PathBuf>>(mut self, prefix: P) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl<'m> Iterator for ManifestWalker<'m> {
    type Item = ManifestNode<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(active_child) = self.active_child.as_mut() {
            match active_child.next() {
                Some(next) => return Some(next),
                None => {
                    self.active_child = None;
                }
            }
        }

        let (name, child) = self.children.next()?;
        let path = self.prefix.join(name);
        if child.kind.is_tree() {
            self.active_child = Some(Box::new(
                ManifestWalker::new(child).with_prefix(&path),
            ));
        }
        Some(ManifestNode { path, entry: child })
    }
}

/// A single entry in a manifest walk, with its position in the tree.
#[derive(Debug, Eq, PartialEq)]
pub struct ManifestNode<'a> {
    pub path: PathBuf,
    pub entry: &'a Entry,
}

/// Build a manifest that describes the contents of a local directory.
///
/// The resulting digest depends only on entry names, file contents, modes,
/// and link targets, never on inode numbers or enumeration order.
pub fn compute_manifest<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    tracing::trace!(path = ?path.as_ref(), "computing manifest");
    let root = compute_tree_node(path.as_ref())?;
    Ok(Manifest { root })
}

fn compute_tree_node(dirname: &Path) -> Result<Entry> {
    let mut tree = Entry::empty_tree();
    tree.mode = std::fs::symlink_metadata(dirname)?.mode();
    for dir_entry in std::fs::read_dir(dirname)? {
        let dir_entry = dir_entry?;
        let name = dir_entry
            .file_name()
            .into_string()
            .map_err(|_| Error::new("file names must be valid utf-8"))?;
        let entry = compute_node(&dir_entry.path())?;
        tree.entries.insert(name, entry);
    }
    tree.size = tree.entries.len() as u64;
    tree.object = tree.digest();
    Ok(tree)
}

fn compute_node(path: &Path) -> Result<Entry> {
    let meta = std::fs::symlink_metadata(path)?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        let target = std::fs::read_link(path)?
            .into_os_string()
            .into_string()
            .map_err(|_| Error::new("symlinks must point to a valid utf-8 path"))?;
        let mut hasher = Hasher::new();
        hasher.update(target.as_bytes());
        return Ok(Entry {
            kind: EntryKind::Blob,
            mode: meta.mode(),
            size: target.len() as u64,
            object: hasher.finish(),
            entries: Default::default(),
        });
    }
    if file_type.is_dir() {
        return compute_tree_node(path);
    }
    // Character devices in a union mount upper dir are whiteout markers.
    if file_type.is_char_device() {
        return Ok(Entry {
            kind: EntryKind::Mask,
            mode: meta.mode(),
            size: 0,
            object: NULL_DIGEST,
            entries: Default::default(),
        });
    }
    if !file_type.is_file() {
        return Err(Error::new(format!("unsupported special file: {:?}", path)));
    }

    let mut reader = std::fs::File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Entry {
        kind: EntryKind::Blob,
        mode: meta.mode(),
        size: meta.size(),
        object: hasher.finish(),
        entries: Default::default(),
    })
}
