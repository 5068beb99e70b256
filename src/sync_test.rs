use std::collections::BTreeMap;

use super::{pull_ref, push_ref, sync_layer, sync_platform, sync_ref};
use crate::config::{load_config, Config, CONFIG_TEST_LOCK};
use crate::storage::{ensure_repository, Layer, Repository};

fn repo_pair() -> (tempfile::TempDir, Repository, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let src = ensure_repository(dir.path().join("src")).unwrap();
    let dest = ensure_repository(dir.path().join("dest")).unwrap();
    (dir, src, dest)
}

fn commit_layer(repo: &Repository, files: &[(&str, &str)]) -> Layer {
    let runtime = repo.runtimes.create_runtime().unwrap();
    for (name, content) in files {
        std::fs::write(runtime.upperdir().join(name), content).unwrap();
    }
    repo.commit_package(&runtime, vec![]).unwrap()
}

#[test]
fn test_sync_layer_transfers_blobs() {
    let (_dir, src, dest) = repo_pair();
    let layer = commit_layer(&src, &[("a", "content a\n"), ("b", "content b\n")]);

    sync_layer(&layer, &src, &dest).unwrap();

    assert!(dest.has_layer(&layer.digest()));
    for node in layer.manifest.walk() {
        if node.entry.kind.is_blob() {
            assert!(dest.has_blob(&node.entry.object));
        }
    }
}

#[test]
fn test_sync_platform_children_first() {
    let (_dir, src, dest) = repo_pair();
    let first = commit_layer(&src, &[("one", "1\n")]);
    let second = commit_layer(&src, &[("two", "2\n")]);
    let platform = crate::storage::Platform::new(vec![first.digest(), second.digest()]);
    src.write_platform(&platform).unwrap();

    sync_platform(&platform, &src, &dest).unwrap();

    assert!(dest.has_layer(&first.digest()));
    assert!(dest.has_layer(&second.digest()));
    assert!(dest.has_platform(&platform.digest()));
}

#[test]
fn test_sync_is_idempotent_and_resumable() {
    let (_dir, src, dest) = repo_pair();
    let first = commit_layer(&src, &[("one", "1\n")]);
    let second = commit_layer(&src, &[("two", "2\n"), ("shared", "s\n")]);
    let platform = crate::storage::Platform::new(vec![first.digest(), second.digest()]);
    src.write_platform(&platform).unwrap();

    // simulate a partial earlier transfer: first layer landed, one of the
    // second layer's blobs landed, but not the layer record itself
    sync_layer(&first, &src, &dest).unwrap();
    let shared_digest = second.manifest.get_path("/shared").unwrap().object;
    let payload = src.open_blob(&shared_digest).unwrap();
    dest.write_blob(payload).unwrap();
    assert!(!dest.has_layer(&second.digest()));

    // resuming completes the layer and then the platform
    sync_platform(&platform, &src, &dest).unwrap();
    assert!(dest.has_layer(&second.digest()));
    assert!(dest.has_platform(&platform.digest()));

    // a second full pass finds everything in place
    sync_platform(&platform, &src, &dest).unwrap();
}

#[test]
fn test_sync_ref_writes_tag_on_dest() {
    let (_dir, src, dest) = repo_pair();
    let layer = commit_layer(&src, &[("data", "x\n")]);
    src.tag(layer.digest().to_string().as_str(), "releases/v1").unwrap();

    sync_ref("releases/v1", &src, &dest).unwrap();

    let resolved = dest.read_ref("releases/v1").unwrap().digest().unwrap();
    assert_eq!(resolved, layer.digest());
}

#[test]
fn test_sync_ref_by_digest_writes_no_tag() {
    let (_dir, src, dest) = repo_pair();
    let layer = commit_layer(&src, &[("data", "x\n")]);

    sync_ref(layer.digest().to_string(), &src, &dest).unwrap();

    assert!(dest.has_layer(&layer.digest()));
    assert!(dest.iter_tags().unwrap().is_empty());
}

#[test]
fn test_push_and_pull_through_configured_remotes() {
    let _guard = CONFIG_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let dir = tempfile::tempdir().unwrap();
    let mut remotes = BTreeMap::new();
    remotes.insert("origin".to_string(), dir.path().join("origin"));
    load_config(Config {
        storage_root: dir.path().join("local"),
        remotes,
    });

    let local = ensure_repository(dir.path().join("local")).unwrap();
    let remote = ensure_repository(dir.path().join("origin")).unwrap();

    // push a tagged layer to the named remote
    let pushed = commit_layer(&local, &[("data", "pushed\n")]);
    local
        .tag(pushed.digest().to_string().as_str(), "releases/v1")
        .unwrap();
    push_ref("releases/v1", "origin").unwrap();
    assert!(remote.has_layer(&pushed.digest()));
    assert_eq!(
        remote.read_ref("releases/v1").unwrap().digest().unwrap(),
        pushed.digest()
    );

    // pull a ref that only the remote has
    let remote_only = commit_layer(&remote, &[("other", "remote\n")]);
    remote
        .tag(remote_only.digest().to_string().as_str(), "releases/v2")
        .unwrap();
    let pulled = pull_ref("releases/v2").unwrap();
    assert_eq!(pulled.digest().unwrap(), remote_only.digest());
    assert!(local.has_layer(&remote_only.digest()));
    assert_eq!(
        local.read_ref("releases/v2").unwrap().digest().unwrap(),
        remote_only.digest()
    );

    // a ref no remote has is reported as unknown
    match pull_ref("releases/v3") {
        Err(crate::Error::UnknownReference(reference)) => assert_eq!(reference, "releases/v3"),
        other => panic!("expected UnknownReference, got {:?}", other.map(|_| ())),
    }
}
