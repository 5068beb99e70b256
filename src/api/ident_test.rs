use rstest::rstest;

use super::{parse_ident, Build, Ident, PkgName};
use crate::api::parse_version;

#[rstest]
#[case("hello")]
#[case("python/2.7")]
#[case("hello/1.0.0/src")]
#[case("my-pkg/1.0/BGSHW3CN")]
#[case("pkg_a/0.1")]
fn test_ident_round_trip(#[case] input: &str) {
    let ident = parse_ident(input).unwrap();
    assert_eq!(ident.to_string(), input);
    let reparsed = parse_ident(ident.to_string()).unwrap();
    assert_eq!(reparsed, ident);
}

#[test]
fn test_parse_ident_components() {
    let ident = parse_ident("hello/1.0.0/src").unwrap();
    assert_eq!(ident.name, PkgName::parse("hello").unwrap());
    assert_eq!(ident.version, parse_version("1.0.0").unwrap());
    assert_eq!(ident.build, Some(Build::Source));
    assert!(ident.is_source());
}

#[test]
fn test_parse_ident_empty_build() {
    let ident = parse_ident("hello/1.0.0/").unwrap();
    assert_eq!(ident.build, None);
    assert!(!ident.is_source());
}

#[rstest]
#[case("hello/1.0.0/src/extra")]
#[case("a/b/c/d")]
fn test_parse_ident_too_many_tokens(#[case] input: &str) {
    match parse_ident(input) {
        Err(crate::Error::InvalidIdent(_)) => {}
        other => panic!("expected InvalidIdent, got {:?}", other),
    }
}

#[rstest]
#[case("")]
#[case("1pkg")]
#[case("has space")]
#[case("pkg/not.a.number")]
#[case("pkg/1.0/NOTVALID!")]
fn test_parse_ident_invalid(#[case] input: &str) {
    assert!(parse_ident(input).is_err());
}

#[test]
fn test_with_build() {
    let ident = parse_ident("hello/1.0.0").unwrap();
    let source = ident.with_build(Some(Build::Source));
    assert_eq!(source.to_string(), "hello/1.0.0/src");
    let back: Ident = source.with_build(None);
    assert_eq!(back, ident);
}

#[test]
fn test_ident_serde_as_string() {
    let ident = parse_ident("hello/1.0.0/src").unwrap();
    let json = serde_json::to_string(&ident).unwrap();
    assert_eq!(json, "\"hello/1.0.0/src\"");
    let back: Ident = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ident);
}
