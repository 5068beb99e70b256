use std::io::Read;

use super::PackageRepo;
use crate::api::{parse_build, parse_version, Build, Ident, PkgName, Spec, Version};
use crate::encoding::Digest;
use crate::storage::Repository;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./store_test.rs"]
mod store_test;

const SPEC_TAG_PREFIX: &str = "spk/spec";
const PKG_TAG_PREFIX: &str = "spk/pkg";

/// A package repository layered onto content-addressed storage.
///
/// Version specs are stored as JSON blobs and indexed through the tag
/// namespace; binary builds are tags pointing at the layer that holds
/// the built package files.
#[derive(Debug)]
pub struct StoreRepo {
    repo: Repository,
}

impl StoreRepo {
    pub fn new(repo: Repository) -> Self {
        StoreRepo { repo }
    }

    pub fn storage(&self) -> &Repository {
        &self.repo
    }

    fn spec_tag(pkg: &Ident) -> String {
        format!("{}/{}/{}", SPEC_TAG_PREFIX, pkg.name, pkg.version)
    }

    fn pkg_tag(pkg: &Ident, build: &Build) -> String {
        format!(
            "{}/{}/{}/{}",
            PKG_TAG_PREFIX, pkg.name, pkg.version, build
        )
    }

    fn read_spec_blob(&self, tag: &str, pkg: &Ident) -> Result<Spec> {
        let digest = match self.repo.iter_tags()?.into_iter().find(|(t, _)| t == tag) {
            Some((_, digest)) => digest,
            None => return Err(Error::PackageNotFound(pkg.clone())),
        };
        let mut buf = Vec::new();
        self.repo.open_blob(&digest)?.read_to_end(&mut buf)?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

impl PackageRepo for StoreRepo {
    fn list_package_names(&self) -> Result<Vec<PkgName>> {
        let mut names = Vec::new();
        for (tag, _) in self.repo.iter_tags()? {
            let mut parts = tag.split('/');
            if (parts.next(), parts.next()) != (Some("spk"), Some("spec")) {
                continue;
            }
            if let Some(name) = parts.next() {
                if let Ok(name) = PkgName::parse(name) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn list_package_versions(&self, name: &PkgName) -> Result<Vec<Version>> {
        let prefix = format!("{}/{}/", SPEC_TAG_PREFIX, name);
        let mut versions = Vec::new();
        for (tag, _) in self.repo.iter_tags()? {
            if let Some(rest) = tag.strip_prefix(&prefix) {
                if let Ok(version) = parse_version(rest) {
                    if !versions.contains(&version) {
                        versions.push(version);
                    }
                }
            }
        }
        // builds may exist for versions whose spec was never published
        let build_prefix = format!("{}/{}/", PKG_TAG_PREFIX, name);
        for (tag, _) in self.repo.iter_tags()? {
            if let Some(rest) = tag.strip_prefix(&build_prefix) {
                if let Some(version) = rest.split('/').next() {
                    if let Ok(version) = parse_version(version) {
                        if !versions.contains(&version) {
                            versions.push(version);
                        }
                    }
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn list_package_builds(&self, pkg: &Ident) -> Result<Vec<Ident>> {
        let prefix = format!("{}/{}/{}/", PKG_TAG_PREFIX, pkg.name, pkg.version);
        let mut builds = Vec::new();
        for (tag, _) in self.repo.iter_tags()? {
            if let Some(rest) = tag.strip_prefix(&prefix) {
                if let Ok(build) = parse_build(rest) {
                    builds.push(pkg.with_build(Some(build)));
                }
            }
        }
        let spec_tag = Self::spec_tag(pkg);
        if self.repo.iter_tags()?.iter().any(|(t, _)| t == &spec_tag) {
            builds.push(pkg.with_build(Some(Build::Source)));
        }
        Ok(builds)
    }

    fn read_spec(&self, pkg: &Ident) -> Result<Spec> {
        match &pkg.build {
            None | Some(Build::Source) => {
                let mut spec = self.read_spec_blob(&Self::spec_tag(pkg), pkg)?;
                spec.pkg = pkg.clone();
                Ok(spec)
            }
            Some(build) => {
                let tag = format!("{}.spec", Self::pkg_tag(pkg, build));
                self.read_spec_blob(&tag, pkg)
            }
        }
    }

    fn get_package(&self, pkg: &Ident) -> Result<Digest> {
        let build = pkg
            .build
            .as_ref()
            .ok_or_else(|| Error::PackageNotFound(pkg.clone()))?;
        let tag = Self::pkg_tag(pkg, build);
        match self.repo.iter_tags()?.into_iter().find(|(t, _)| t == &tag) {
            Some((_, digest)) => Ok(digest),
            None => Err(Error::PackageNotFound(pkg.clone())),
        }
    }

    fn publish_spec(&mut self, spec: Spec) -> Result<()> {
        if spec.pkg.build.is_some() {
            return Err(Error::new(format!(
                "version spec must not name a build: {}",
                spec.pkg
            )));
        }
        let payload = serde_json::to_vec(&spec)?;
        let digest = self.repo.write_blob(std::io::Cursor::new(payload))?;
        self.repo.push_tag(&Self::spec_tag(&spec.pkg), &digest)
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
        let tag = Self::pkg_tag(&spec.pkg, &build);
        let payload = serde_json::to_vec(&spec)?;
        let spec_digest = self.repo.write_blob(std::io::Cursor::new(payload))?;
        self.repo.push_tag(&format!("{}.spec", tag), &spec_digest)?;
        self.repo.push_tag(&tag, &digest)
    }
}
