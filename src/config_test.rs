use std::collections::BTreeMap;

use super::{get_config, load_config, Config, CONFIG_TEST_LOCK};

#[test]
fn test_config_opens_repositories() {
    let dir = tempfile::tempdir().unwrap();
    let mut remotes = BTreeMap::new();
    remotes.insert("origin".to_string(), dir.path().join("origin"));
    let config = Config {
        storage_root: dir.path().join("local"),
        remotes,
    };

    // both the local repository and the named remote are created on
    // first use
    let local = config.get_repository().unwrap();
    assert!(local.root().join("pack").is_dir());
    let remote = config.get_remote("origin").unwrap();
    assert!(remote.root().join("tags").is_dir());

    assert_eq!(config.list_remote_names(), vec!["origin".to_string()]);
}

#[test]
fn test_config_unknown_remote() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        storage_root: dir.path().join("local"),
        remotes: BTreeMap::new(),
    };
    match config.get_remote("nowhere") {
        Err(crate::Error::UnknownReference(reference)) => {
            assert_eq!(reference, "remote: nowhere")
        }
        other => panic!("expected UnknownReference, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_load_config_replaces_process_config() {
    let _guard = CONFIG_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let dir = tempfile::tempdir().unwrap();
    let mut remotes = BTreeMap::new();
    remotes.insert("origin".to_string(), dir.path().join("origin"));
    load_config(Config {
        storage_root: dir.path().join("local"),
        remotes,
    });

    let current = get_config();
    assert_eq!(current.storage_root, dir.path().join("local"));
    assert_eq!(current.list_remote_names(), vec!["origin".to_string()]);

    // a later load wins over the earlier one
    load_config(Config {
        storage_root: dir.path().join("other"),
        remotes: BTreeMap::new(),
    });
    let current = get_config();
    assert_eq!(current.storage_root, dir.path().join("other"));
    assert!(current.list_remote_names().is_empty());
}
