use std::collections::BTreeMap;

use super::PackageRepo;
use crate::api::{Build, Ident, PkgName, Spec, Version};
use crate::encoding::Digest;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./mem_test.rs"]
mod mem_test;

/// An in-memory package repository.
#[derive(Debug, Default)]
pub struct MemRepo {
    specs: BTreeMap<PkgName, BTreeMap<Version, Spec>>,
    packages: BTreeMap<PkgName, BTreeMap<Version, BTreeMap<Build, (Spec, Digest)>>>,
}

impl MemRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PackageRepo for MemRepo {
    fn list_package_names(&self) -> Result<Vec<PkgName>> {
        let mut names: Vec<_> = self.specs.keys().cloned().collect();
        for name in self.packages.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        Ok(names)
    }

    fn list_package_versions(&self, name: &PkgName) -> Result<Vec<Version>> {
        let mut versions: Vec<_> = self
            .specs
            .get(name)
            .map(|by_version| by_version.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(by_version) = self.packages.get(name) {
            for version in by_version.keys() {
                if !versions.contains(version) {
                    versions.push(version.clone());
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn list_package_builds(&self, pkg: &Ident) -> Result<Vec<Ident>> {
        let mut builds = Vec::new();
        if let Some(by_build) = self
            .packages
            .get(&pkg.name)
            .and_then(|by_version| by_version.get(&pkg.version))
        {
            for build in by_build.keys() {
                builds.push(pkg.with_build(Some(build.clone())));
            }
        }
        if self
            .specs
            .get(&pkg.name)
            .and_then(|by_version| by_version.get(&pkg.version))
            .is_some()
        {
            builds.push(pkg.with_build(Some(Build::Source)));
        }
        Ok(builds)
    }

    fn read_spec(&self, pkg: &Ident) -> Result<Spec> {
        match &pkg.build {
            None | Some(Build::Source) => {
                let spec = self
                    .specs
                    .get(&pkg.name)
                    .and_then(|by_version| by_version.get(&pkg.version))
                    .ok_or_else(|| Error::PackageNotFound(pkg.clone()))?;
                let mut spec = spec.clone();
                spec.pkg = pkg.clone();
                Ok(spec)
            }
            Some(build) => {
                let (spec, _) = self
                    .packages
                    .get(&pkg.name)
                    .and_then(|by_version| by_version.get(&pkg.version))
                    .and_then(|by_build| by_build.get(build))
                    .ok_or_else(|| Error::PackageNotFound(pkg.clone()))?;
                Ok(spec.clone())
            }
        }
    }

    fn get_package(&self, pkg: &Ident) -> Result<Digest> {
        let build = pkg
            .build
            .as_ref()
            .ok_or_else(|| Error::PackageNotFound(pkg.clone()))?;
        self.packages
            .get(&pkg.name)
            .and_then(|by_version| by_version.get(&pkg.version))
            .and_then(|by_build| by_build.get(build))
            .map(|(_, digest)| *digest)
            .ok_or_else(|| Error::PackageNotFound(pkg.clone()))
    }

    fn publish_spec(&mut self, spec: Spec) -> Result<()> {
        if spec.pkg.build.is_some() {
            return Err(Error::new(format!(
                "version spec must not name a build: {}",
                spec.pkg
            )));
        }
        self.specs
            .entry(spec.pkg.name.clone())
            .or_default()
            .insert(spec.pkg.version.clone(), spec);
        Ok(())
    }

    fn publish_package(&mut self, spec: Spec, digest: Digest) -> Result<()> {
        let build = match &spec.pkg.build {
            Some(Build::Source) | None => {
                return Err(Error::new(format!(
                    "published package must name a binary build: {}",
                    spec.pkg
                )))
            }
            Some(build) => build.clone(),
        };
        self.packages
            .entry(spec.pkg.name.clone())
            .or_default()
            .entry(spec.pkg.version.clone())
            .or_default()
            .insert(build, (spec, digest));
        Ok(())
    }
}
