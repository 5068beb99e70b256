use super::{ensure_repository, Object};

#[test]
fn test_ensure_repository_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("repo");
    ensure_repository(&root).unwrap();

    assert!(root.join("pack").is_dir());
    assert!(root.join("pack/renders").is_dir());
    assert!(root.join("pack/meta").is_dir());
    assert!(root.join("plat").is_dir());
    assert!(root.join("run").is_dir());
    assert!(root.join("tags").is_dir());

    // a second call opens the same structure without complaint
    ensure_repository(&root).unwrap();
}

#[test]
fn test_read_ref_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ensure_repository(dir.path().join("repo")).unwrap();
    match repo.read_ref("no-such-thing") {
        Err(crate::Error::UnknownReference(reference)) => assert_eq!(reference, "no-such-thing"),
        other => panic!("expected UnknownReference, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_commit_tag_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ensure_repository(dir.path().join("repo")).unwrap();

    let runtime = repo.runtimes.create_runtime().unwrap();
    std::fs::write(runtime.upperdir().join("greeting"), "hi\n").unwrap();
    let layer = repo
        .commit_package(&runtime, vec![("GREETING".into(), "hi".into())])
        .unwrap();
    let digest = layer.digest();

    // readable by digest string
    let by_digest = repo.read_ref(digest.to_string()).unwrap();
    assert_eq!(by_digest.digest().unwrap(), digest);

    // and by tag after tagging
    repo.tag(digest.to_string().as_str(), "envs/greeting").unwrap();
    let by_tag = repo.read_ref("envs/greeting").unwrap();
    assert_eq!(by_tag.digest().unwrap(), digest);
    match by_tag {
        Object::Layer(layer) => {
            assert_eq!(layer.env, vec![("GREETING".to_string(), "hi".to_string())])
        }
        other => panic!("expected a layer, got {:?}", other),
    }
}

#[test]
fn test_tags_are_retargetable() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ensure_repository(dir.path().join("repo")).unwrap();

    let runtime = repo.runtimes.create_runtime().unwrap();
    std::fs::write(runtime.upperdir().join("a"), "one\n").unwrap();
    let first = repo.commit_package(&runtime, vec![]).unwrap();
    repo.tag(first.digest().to_string().as_str(), "latest").unwrap();

    std::fs::write(runtime.upperdir().join("b"), "two\n").unwrap();
    let second = repo.commit_package(&runtime, vec![]).unwrap();
    repo.tag(second.digest().to_string().as_str(), "latest").unwrap();

    let resolved = repo.read_ref("latest").unwrap().digest().unwrap();
    assert_eq!(resolved, second.digest());
}

#[test]
fn test_find_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ensure_repository(dir.path().join("repo")).unwrap();

    let runtime = repo.runtimes.create_runtime().unwrap();
    std::fs::write(runtime.upperdir().join("a"), "data\n").unwrap();
    let layer = repo.commit_package(&runtime, vec![]).unwrap();
    let digest = layer.digest().to_string();

    repo.tag(digest.as_str(), "one").unwrap();
    repo.tag(digest.as_str(), "group/two").unwrap();

    let mut aliases = repo.find_aliases("one").unwrap();
    aliases.sort();
    assert_eq!(aliases, vec!["group/two".to_string(), "one".to_string()]);
}

#[test]
fn test_commit_platform_stacks_layers() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ensure_repository(dir.path().join("repo")).unwrap();

    let mut runtime = repo.runtimes.create_runtime().unwrap();
    std::fs::write(runtime.upperdir().join("base"), "base\n").unwrap();
    let base = repo.commit_package(&runtime, vec![]).unwrap();
    runtime.append_layer(base.digest().to_string()).unwrap();

    // clear the upper dir the way a fresh mount would present it
    std::fs::remove_file(runtime.upperdir().join("base")).unwrap();
    std::fs::write(runtime.upperdir().join("extra"), "extra\n").unwrap();

    let platform = repo.commit_platform(&mut runtime, vec![]).unwrap();
    assert_eq!(platform.stack.len(), 2);
    assert_eq!(platform.stack[0], base.digest());
    assert!(repo.has_platform(&platform.digest()));

    // the runtime stack now ends with the committed top layer
    assert_eq!(runtime.config.layers.len(), 2);
    assert_eq!(
        platform.stack[1].to_string(),
        runtime.config.layers[1]
    );
}

#[test]
fn test_runtime_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ensure_repository(dir.path().join("repo")).unwrap();

    let mut runtime = repo.runtimes.create_runtime().unwrap();
    assert!(runtime.upperdir().is_dir());
    assert!(runtime.workdir().is_dir());
    assert!(runtime.lowerdir().is_dir());
    assert!(runtime.rootdir().is_dir());

    runtime.append_layer("some-ref").unwrap();
    let reread = repo.runtimes.read_runtime(&runtime.id).unwrap();
    assert_eq!(reread.config.layers, vec!["some-ref".to_string()]);

    repo.runtimes.remove_runtime(&runtime.id).unwrap();
    assert!(repo.runtimes.read_runtime(&runtime.id).is_err());
}
