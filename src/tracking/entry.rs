use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::encoding::{Digest, Hasher, NULL_DIGEST};

const MODE_FORMAT_MASK: u32 = 0o170000;
const MODE_SYMLINK: u32 = 0o120000;
const MODE_REGULAR: u32 = 0o100000;
const MODE_DIR: u32 = 0o040000;

/// A list of possible entry types in a manifest.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub enum EntryKind {
    /// A directory possibly containing other entries.
    Tree,
    /// A file or symlink whose content is stored as a blob.
    Blob,
    /// A deletion of an entry from a lower layer.
    Mask,
}

impl EntryKind {
    pub fn is_tree(&self) -> bool {
        matches!(self, EntryKind::Tree)
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, EntryKind::Blob)
    }

    pub fn is_mask(&self) -> bool {
        matches!(self, EntryKind::Mask)
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            EntryKind::Tree => f.write_str("tree"),
            EntryKind::Blob => f.write_str("file"),
            EntryKind::Mask => f.write_str("mask"),
        }
    }
}

/// A single node in a manifest tree.
///
/// Trees carry their children in `entries`; blobs and masks leave it empty.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Entry {
    pub kind: EntryKind,
    /// Full POSIX mode bits, permissions and file type included.
    pub mode: u32,
    pub size: u64,
    pub object: Digest,
    #[serde(default)]
    pub entries: BTreeMap<String, Entry>,
}

impl Default for Entry {
    fn default() -> Self {
        Entry::empty_tree()
    }
}

impl Entry {
    pub fn empty_tree() -> Self {
        Entry {
            kind: EntryKind::Tree,
            mode: MODE_DIR | 0o777,
            size: 0,
            object: NULL_DIGEST,
            entries: BTreeMap::new(),
        }
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & MODE_FORMAT_MASK == MODE_SYMLINK
    }

    pub fn is_regular_file(&self) -> bool {
        self.mode & MODE_FORMAT_MASK == MODE_REGULAR
    }

    /// Computes the digest of this entry.
    ///
    /// For a tree, this is the hash of the canonical serialization of its
    /// sorted child entries and is recomputed from the current children.
    /// Blobs and masks return their recorded object digest.
    pub fn digest(&self) -> Digest {
        match self.kind {
            EntryKind::Tree => {
                let mut hasher = Hasher::new();
                for (name, entry) in &self.entries {
                    hasher.update(name.as_bytes());
                    hasher.update(b"\x00");
                    hasher.update(entry.kind.to_string().as_bytes());
                    hasher.update(b"\x00");
                    hasher.update(format!("{:06o}", entry.mode).as_bytes());
                    hasher.update(b"\x00");
                    hasher.update(entry.digest().as_bytes());
                    hasher.update(b"\n");
                }
                hasher.finish()
            }
            EntryKind::Blob | EntryKind::Mask => self.object,
        }
    }
}
