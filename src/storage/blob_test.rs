use std::io::Read;
use std::os::unix::fs::{MetadataExt, PermissionsExt};

use super::BlobStorage;
use crate::tracking::compute_manifest;

fn storage() -> (tempfile::TempDir, BlobStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = BlobStorage::new(dir.path().join("pack"));
    std::fs::create_dir_all(storage.root()).unwrap();
    (dir, storage)
}

#[test]
fn test_write_blob_round_trip() {
    let (_dir, storage) = storage();
    let digest = storage.write_blob(std::io::Cursor::new(b"hello\n".to_vec())).unwrap();
    assert_eq!(
        digest.to_string(),
        "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
    );

    let mut content = String::new();
    storage.open_blob(&digest).unwrap().read_to_string(&mut content).unwrap();
    assert_eq!(content, "hello\n");
}

#[test]
fn test_write_blob_is_idempotent() {
    let (_dir, storage) = storage();
    let first = storage.write_blob(std::io::Cursor::new(b"hello\n".to_vec())).unwrap();
    let ino = std::fs::metadata(storage.build_digest_path(&first)).unwrap().ino();

    let second = storage.write_blob(std::io::Cursor::new(b"hello\n".to_vec())).unwrap();
    assert_eq!(first, second);
    let ino2 = std::fs::metadata(storage.build_digest_path(&second)).unwrap().ino();
    assert_eq!(ino, ino2, "second write must not replace the stored file");

    // no working files left behind
    let leftovers: Vec<_> = std::fs::read_dir(storage.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("work-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_open_blob_unknown() {
    let (_dir, storage) = storage();
    let missing = crate::encoding::Digest::from_bytes(b"never stored");
    match storage.open_blob(&missing) {
        Err(crate::Error::UnknownObject(digest)) => assert_eq!(digest, missing),
        other => panic!("expected UnknownObject, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_commit_and_render_round_trip() {
    let (_dir, storage) = storage();
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir(src.path().join("bin")).unwrap();
    std::fs::write(src.path().join("bin/tool"), "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(
        src.path().join("bin/tool"),
        std::fs::Permissions::from_mode(0o755),
    )
    .unwrap();
    std::fs::write(src.path().join("hosts"), "localhost\n").unwrap();
    std::fs::set_permissions(src.path().join("hosts"), std::fs::Permissions::from_mode(0o644))
        .unwrap();
    std::os::unix::fs::symlink("hosts", src.path().join("hosts.link")).unwrap();

    let manifest = storage.commit_dir(src.path()).unwrap();
    let rendered = storage.render_manifest(&manifest).unwrap();

    // contents
    assert_eq!(
        std::fs::read_to_string(rendered.join("bin/tool")).unwrap(),
        "#!/bin/sh\n"
    );
    assert_eq!(
        std::fs::read_to_string(rendered.join("hosts")).unwrap(),
        "localhost\n"
    );
    let target = std::fs::read_link(rendered.join("hosts.link")).unwrap();
    assert_eq!(target.to_str().unwrap(), "hosts");

    // final permissions match the manifest, not the storage mask
    let tool_mode = std::fs::metadata(rendered.join("bin/tool")).unwrap().mode();
    assert_eq!(tool_mode & 0o7777, 0o755);
    let hosts_mode = std::fs::metadata(rendered.join("hosts")).unwrap().mode();
    assert_eq!(hosts_mode & 0o7777, 0o644);

    // a recomputed manifest of the render matches the committed one
    let recomputed = compute_manifest(&rendered).unwrap();
    assert_eq!(recomputed.digest(), manifest.digest());
}

#[test]
fn test_render_is_idempotent() {
    let (_dir, storage) = storage();
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("data"), "1234\n").unwrap();

    let manifest = storage.commit_dir(src.path()).unwrap();
    let first = storage.render_manifest(&manifest).unwrap();
    let second = storage.render_manifest(&manifest).unwrap();
    assert_eq!(first, second);

    // removing the sentinel but leaving files in place re-renders cleanly
    let marker = first.parent().unwrap().join(format!(
        "{}.completed",
        first.file_name().unwrap().to_str().unwrap()
    ));
    std::fs::remove_file(&marker).unwrap();
    let third = storage.render_manifest(&manifest).unwrap();
    assert_eq!(first, third);
    assert!(marker.exists());
}

#[test]
fn test_rendered_files_share_inodes() {
    let (_dir, storage) = storage();
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("data"), "shared content\n").unwrap();

    let manifest = storage.commit_dir(src.path()).unwrap();
    let rendered = storage.render_manifest(&manifest).unwrap();

    let entry = manifest.get_path("/data").unwrap();
    let stored = std::fs::metadata(storage.build_digest_path(&entry.object)).unwrap();
    let linked = std::fs::metadata(rendered.join("data")).unwrap();
    assert_eq!(stored.ino(), linked.ino());
}

#[test]
fn test_render_missing_blob_fails() {
    let (_dir, storage) = storage();
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("data"), "present\n").unwrap();
    let manifest = compute_manifest(src.path()).unwrap();

    // nothing was committed, so the render must fail with UnknownObject
    match storage.render_manifest(&manifest) {
        Err(crate::Error::UnknownObject(_)) => {}
        other => panic!("expected UnknownObject, got {:?}", other.map(|_| ())),
    }
}
