use serde::{Deserialize, Serialize};

use super::{
    parse_version_filter, Ident, OptionMap, PkgName, PkgRequest, RangeIdent, Request, VarRequest,
};
use crate::Result;

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// A package specification: what a package is and what it needs.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Spec {
    pub pkg: Ident,
    #[serde(default, skip_serializing_if = "BuildSpec::is_default")]
    pub build: BuildSpec,
    #[serde(default, skip_serializing_if = "InstallSpec::is_default")]
    pub install: InstallSpec,
}

impl Spec {
    pub fn new(pkg: Ident) -> Self {
        Spec {
            pkg,
            build: BuildSpec::default(),
            install: InstallSpec::default(),
        }
    }

    /// Resolve the final value of every build option, given values
    /// provided by the current context.
    pub fn resolve_all_options(&self, given: &OptionMap) -> OptionMap {
        let mut resolved = OptionMap::default();
        for opt in &self.build.options {
            let name = opt.name();
            let value = given
                .get(name)
                .cloned()
                .unwrap_or_else(|| opt.default_value().to_string());
            resolved.insert(name.to_string(), value);
        }
        resolved
    }
}

/// The build-time portion of a package spec.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct BuildSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Opt>,
}

impl BuildSpec {
    fn is_default(&self) -> bool {
        self.options.is_empty()
    }
}

/// The install-time portion of a package spec.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct InstallSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Request>,
}

impl InstallSpec {
    fn is_default(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Iterate only the package requirements.
    pub fn pkg_requirements(&self) -> impl Iterator<Item = &PkgRequest> {
        self.requirements.iter().filter_map(|r| match r {
            Request::Pkg(request) => Some(request),
            Request::Var(_) => None,
        })
    }
}

/// A build option declared by a package spec.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Opt {
    Pkg(PkgOpt),
    Var(VarOpt),
}

impl Opt {
    pub fn name(&self) -> &str {
        match self {
            Opt::Pkg(opt) => opt.pkg.as_str(),
            Opt::Var(opt) => opt.var.as_str(),
        }
    }

    pub fn default_value(&self) -> &str {
        match self {
            Opt::Pkg(opt) => opt.default.as_str(),
            Opt::Var(opt) => opt.default.as_str(),
        }
    }
}

/// A build option that pulls another package into the build environment.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PkgOpt {
    pub pkg: PkgName,
    /// Default version filter applied when the context provides no value.
    #[serde(default)]
    pub default: String,
}

impl PkgOpt {
    /// Turn this option into a package request, preferring the given
    /// already-constrained value over the declared default.
    pub fn to_request(&self, given: Option<&str>) -> Result<PkgRequest> {
        let value = given.unwrap_or(self.default.as_str());
        let version = parse_version_filter(value)?;
        Ok(PkgRequest::new(RangeIdent {
            name: self.pkg.clone(),
            version,
            build: None,
        }))
    }
}

/// A build option naming a free variable of the build.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct VarOpt {
    pub var: String,
    #[serde(default)]
    pub default: String,
}

impl VarOpt {
    pub fn to_request(&self, given: Option<&str>) -> VarRequest {
        let value = given.unwrap_or(self.default.as_str());
        VarRequest::new(self.var.clone(), value)
    }
}
