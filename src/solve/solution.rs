use std::sync::Arc;

use crate::api::{Ident, OptionMap, PkgRequest, Spec};
use crate::repo::PackageRepo;
use crate::{Error, Result};

/// Where a resolved package came from.
#[derive(Clone, Debug)]
pub enum PackageSource {
    /// A package found in a configured repository.
    Repository(Arc<dyn PackageRepo>),
    /// A package that must be built from the given source recipe, in the
    /// attached, fully resolved build environment.
    BuildFromSource {
        recipe: Arc<Spec>,
        build_env: Box<Solution>,
    },
}

impl PackageSource {
    /// Read the spec of another package of the same origin.
    ///
    /// Only repository sources can provide further specs; a package
    /// carried inline by another spec has nothing more to offer.
    pub fn read_spec(&self, pkg: &Ident) -> Result<Spec> {
        match self {
            PackageSource::Repository(repo) => repo.read_spec(pkg),
            PackageSource::BuildFromSource { .. } => Err(Error::PackageNotFound(pkg.clone())),
        }
    }
}

/// A single resolved package in a solution.
#[derive(Clone, Debug)]
pub struct SolvedRequest {
    pub request: PkgRequest,
    pub spec: Arc<Spec>,
    pub source: PackageSource,
}

/// The final result of a solver run: an ordered set of resolved packages
/// and the options that they were resolved under.
///
/// Packages are ordered topologically over the runtime dependency graph,
/// providers before consumers, with ties broken by resolution order.
#[derive(Clone, Debug, Default)]
pub struct Solution {
    options: OptionMap,
    resolved: Vec<SolvedRequest>,
}

impl Solution {
    pub fn new(options: OptionMap) -> Self {
        Solution {
            options,
            resolved: Vec::new(),
        }
    }

    pub fn add(&mut self, request: PkgRequest, spec: Arc<Spec>, source: PackageSource) {
        self.resolved.push(SolvedRequest {
            request,
            spec,
            source,
        });
    }

    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    pub fn items(&self) -> &[SolvedRequest] {
        &self.resolved
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Find the resolved package with the given name.
    pub fn get<S: AsRef<str>>(&self, name: S) -> Option<&SolvedRequest> {
        self.resolved
            .iter()
            .find(|r| r.spec.pkg.name.as_str() == name.as_ref())
    }
}
