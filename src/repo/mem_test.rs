use super::MemRepo;
use crate::api::{parse_ident, Build, Spec};
use crate::encoding::Digest;
use crate::repo::PackageRepo;

fn version_spec(ident: &str) -> Spec {
    Spec::new(parse_ident(ident).unwrap())
}

#[test]
fn test_publish_and_list() {
    let mut repo = MemRepo::new();
    repo.publish_spec(version_spec("mypkg/1.0.0")).unwrap();
    repo.publish_spec(version_spec("mypkg/2.0.0")).unwrap();
    repo.publish_spec(version_spec("other/0.1")).unwrap();

    let names: Vec<_> = repo
        .list_package_names()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(names, vec!["mypkg".to_string(), "other".to_string()]);

    let versions: Vec<_> = repo
        .list_package_versions(&"mypkg".parse().unwrap())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(versions, vec!["1.0.0".to_string(), "2.0.0".to_string()]);
}

#[test]
fn test_version_spec_yields_source_build() {
    let mut repo = MemRepo::new();
    repo.publish_spec(version_spec("mypkg/1.0.0")).unwrap();

    let builds = repo
        .list_package_builds(&parse_ident("mypkg/1.0.0").unwrap())
        .unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].to_string(), "mypkg/1.0.0/src");

    let spec = repo.read_spec(&builds[0]).unwrap();
    assert_eq!(spec.pkg.build, Some(Build::Source));
}

#[test]
fn test_published_package_is_listed_and_readable() {
    let mut repo = MemRepo::new();
    repo.publish_spec(version_spec("mypkg/1.0.0")).unwrap();
    let digest = Digest::from_bytes(b"layer payload");
    repo.publish_package(version_spec("mypkg/1.0.0/BGSHW3CN"), digest)
        .unwrap();

    let builds = repo
        .list_package_builds(&parse_ident("mypkg/1.0.0").unwrap())
        .unwrap();
    let rendered: Vec<_> = builds.iter().map(ToString::to_string).collect();
    assert!(rendered.contains(&"mypkg/1.0.0/BGSHW3CN".to_string()));
    assert!(rendered.contains(&"mypkg/1.0.0/src".to_string()));

    let stored = repo
        .get_package(&parse_ident("mypkg/1.0.0/BGSHW3CN").unwrap())
        .unwrap();
    assert_eq!(stored, digest);
}

#[test]
fn test_read_spec_not_found() {
    let repo = MemRepo::new();
    match repo.read_spec(&parse_ident("ghost/1.0").unwrap()) {
        Err(crate::Error::PackageNotFound(pkg)) => assert_eq!(pkg.to_string(), "ghost/1.0"),
        other => panic!("expected PackageNotFound, got {:?}", other),
    }
}

#[test]
fn test_publish_package_requires_binary_build() {
    let mut repo = MemRepo::new();
    let digest = Digest::from_bytes(b"x");
    assert!(repo
        .publish_package(version_spec("mypkg/1.0.0/src"), digest)
        .is_err());
    assert!(repo
        .publish_package(version_spec("mypkg/1.0.0"), digest)
        .is_err());
}
