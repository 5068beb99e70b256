use super::{Opt, PkgOpt, Spec, VarOpt};
use crate::api::{parse_ident, OptionMap, Request};

fn spec_json() -> serde_json::Value {
    serde_json::json!({
        "pkg": "mytool/1.2.0",
        "build": {
            "options": [
                {"pkg": "gcc", "default": "6.3"},
                {"var": "debug", "default": "off"},
            ],
        },
        "install": {
            "requirements": ["dep/1.0", {"var": "abi", "value": "cxx11"}],
        },
    })
}

#[test]
fn test_spec_deserialize() {
    let spec: Spec = serde_json::from_value(spec_json()).unwrap();
    assert_eq!(spec.pkg, parse_ident("mytool/1.2.0").unwrap());
    assert_eq!(spec.build.options.len(), 2);
    match &spec.build.options[0] {
        Opt::Pkg(PkgOpt { pkg, default }) => {
            assert_eq!(pkg.as_str(), "gcc");
            assert_eq!(default, "6.3");
        }
        other => panic!("expected a pkg option, got {:?}", other),
    }
    match &spec.build.options[1] {
        Opt::Var(VarOpt { var, default }) => {
            assert_eq!(var, "debug");
            assert_eq!(default, "off");
        }
        other => panic!("expected a var option, got {:?}", other),
    }

    let requirements: Vec<_> = spec.install.requirements.iter().collect();
    assert_eq!(requirements.len(), 2);
    assert!(matches!(requirements[0], Request::Pkg(_)));
    assert!(matches!(requirements[1], Request::Var(_)));
}

#[test]
fn test_spec_round_trip() {
    let spec: Spec = serde_json::from_value(spec_json()).unwrap();
    let encoded = serde_json::to_string(&spec).unwrap();
    let decoded: Spec = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, spec);
}

#[test]
fn test_resolve_all_options() {
    let spec: Spec = serde_json::from_value(spec_json()).unwrap();

    let resolved = spec.resolve_all_options(&OptionMap::default());
    assert_eq!(resolved.get("gcc").map(String::as_str), Some("6.3"));
    assert_eq!(resolved.get("debug").map(String::as_str), Some("off"));

    let mut given = OptionMap::default();
    given.insert("debug".to_string(), "on".to_string());
    let resolved = spec.resolve_all_options(&given);
    assert_eq!(resolved.get("debug").map(String::as_str), Some("on"));
}

#[test]
fn test_pkg_opt_to_request() {
    let opt = PkgOpt {
        pkg: "gcc".parse().unwrap(),
        default: "6.3".to_string(),
    };
    let request = opt.to_request(None).unwrap();
    assert_eq!(request.to_string(), "gcc/6.3");

    let request = opt.to_request(Some("9.2")).unwrap();
    assert_eq!(request.to_string(), "gcc/9.2");
}
