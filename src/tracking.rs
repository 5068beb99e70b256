//! File manifest data model and computation.

pub use self::entry::{Entry, EntryKind};
pub use self::manifest::{compute_manifest, Manifest, ManifestNode, ManifestWalker};

mod entry;
mod manifest;
