//! Point-to-point synchronization of refs between repositories.

use crate::config::get_config;
use crate::storage::{Layer, Object, Platform, Repository};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./sync_test.rs"]
mod sync_test;

/// Push a local ref and its transitive closure to a named remote.
pub fn push_ref<S: AsRef<str>>(reference: S, remote_name: &str) -> Result<Object> {
    let config = get_config();
    let local = config.get_repository()?;
    let remote = config.get_remote(remote_name)?;
    sync_ref(reference, &local, &remote)
}

/// Pull a ref into the local repository, searching all configured remotes.
pub fn pull_ref<S: AsRef<str>>(reference: S) -> Result<Object> {
    let config = get_config();
    let local = config.get_repository()?;
    for name in config.list_remote_names() {
        let remote = config.get_remote(&name)?;
        if !remote.has_ref(reference.as_ref()) {
            continue;
        }
        return sync_ref(reference, &remote, &local);
    }
    Err(Error::UnknownReference(reference.as_ref().to_string()))
}

/// Sync a ref and everything it references from `src` to `dest`.
///
/// When the ref is a tag rather than a digest, the tag is written on the
/// destination after its target has fully landed.
pub fn sync_ref<S: AsRef<str>>(reference: S, src: &Repository, dest: &Repository) -> Result<Object> {
    let reference = reference.as_ref();
    let obj = src.read_ref(reference)?;
    sync_object(&obj, src, dest)?;
    let digest = obj.digest()?;
    if digest.to_string() != reference {
        dest.push_tag(reference, &digest)?;
    }
    Ok(obj)
}

pub fn sync_object(obj: &Object, src: &Repository, dest: &Repository) -> Result<()> {
    match obj {
        Object::Layer(layer) => sync_layer(layer, src, dest),
        Object::Platform(platform) => sync_platform(platform, src, dest),
        Object::Runtime(runtime) => Err(Error::new(format!(
            "runtime {} cannot be synced between repositories",
            runtime.id
        ))),
    }
}

/// Sync a platform, its layers first.
///
/// The platform record is only written once every stack entry is fully
/// present on the destination, so an interrupted sync never leaves a
/// dangling platform.
pub fn sync_platform(platform: &Platform, src: &Repository, dest: &Repository) -> Result<()> {
    let digest = platform.digest();
    if dest.has_platform(&digest) {
        tracing::info!(%digest, "platform already synced");
        return Ok(());
    }
    tracing::info!(%digest, "syncing platform");
    for layer in &platform.stack {
        sync_ref(layer.to_string(), src, dest)?;
    }

    dest.write_platform(platform)?;
    Ok(())
}

/// Sync a layer, its blobs first.
///
/// Blobs already present on the destination are skipped, which makes the
/// operation idempotent and resumable: re-invoking after a partial
/// failure transfers only what is still missing.
pub fn sync_layer(layer: &Layer, src: &Repository, dest: &Repository) -> Result<()> {
    let digest = layer.digest();
    if dest.has_layer(&digest) {
        tracing::info!(%digest, "layer already synced");
        return Ok(());
    }

    tracing::info!(%digest, "syncing layer");
    let total_entries = layer.manifest.walk().count();
    for (i, node) in layer.manifest.walk().enumerate() {
        if i % 100 == 0 {
            tracing::info!("syncing layer data [{}/{}]", i, total_entries);
        }
        if !node.entry.kind.is_blob() {
            continue;
        }
        if dest.has_blob(&node.entry.object) {
            tracing::debug!(digest = %node.entry.object, "blob already synced");
            continue;
        }
        tracing::debug!(digest = %node.entry.object, "syncing blob");
        let payload = src.open_blob(&node.entry.object)?;
        let written = dest.write_blob(payload)?;
        if written != node.entry.object {
            return Err(Error::DigestMismatch {
                expected: node.entry.object,
                actual: written,
            });
        }
    }

    dest.write_layer(layer)?;
    Ok(())
}
