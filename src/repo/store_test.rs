use super::StoreRepo;
use crate::api::{parse_ident, Spec};
use crate::repo::PackageRepo;
use crate::storage::ensure_repository;

fn store_repo(dir: &tempfile::TempDir) -> StoreRepo {
    StoreRepo::new(ensure_repository(dir.path().join("repo")).unwrap())
}

#[test]
fn test_spec_round_trip_through_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = store_repo(&dir);

    let spec: Spec = serde_json::from_value(serde_json::json!({
        "pkg": "mytool/1.2.0",
        "install": {"requirements": ["dep/1.0"]},
    }))
    .unwrap();
    repo.publish_spec(spec.clone()).unwrap();

    let read = repo.read_spec(&parse_ident("mytool/1.2.0").unwrap()).unwrap();
    assert_eq!(read, spec);

    let versions: Vec<_> = repo
        .list_package_versions(&"mytool".parse().unwrap())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(versions, vec!["1.2.0".to_string()]);
}

#[test]
fn test_published_package_points_at_layer() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = store_repo(&dir);

    // commit a real layer to stand in for the built package files
    let runtime = repo.storage().runtimes.create_runtime().unwrap();
    std::fs::write(runtime.upperdir().join("tool"), "built\n").unwrap();
    let layer = repo.storage().commit_package(&runtime, vec![]).unwrap();

    repo.publish_spec(Spec::new(parse_ident("mytool/1.2.0").unwrap()))
        .unwrap();
    let build_spec = Spec::new(parse_ident("mytool/1.2.0/BGSHW3CN").unwrap());
    repo.publish_package(build_spec, layer.digest()).unwrap();

    let ident = parse_ident("mytool/1.2.0/BGSHW3CN").unwrap();
    let digest = repo.get_package(&ident).unwrap();
    assert_eq!(digest, layer.digest());

    // the digest resolves through the storage layer to the same object
    let object = repo.storage().read_ref(digest.to_string()).unwrap();
    assert_eq!(object.digest().unwrap(), layer.digest());

    let builds: Vec<_> = repo
        .list_package_builds(&parse_ident("mytool/1.2.0").unwrap())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert!(builds.contains(&"mytool/1.2.0/BGSHW3CN".to_string()));
    assert!(builds.contains(&"mytool/1.2.0/src".to_string()));
}
