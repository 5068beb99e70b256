use std::collections::VecDeque;
use std::sync::Arc;

use super::solution::PackageSource;
use crate::api::{Ident, PkgName, Spec, Version};
use crate::repo::PackageRepo;
use crate::{Error, Result};

/// A stateful cursor over the candidate specs for one package.
///
/// Repositories are visited in registration order, versions in
/// descending order, and within a version binary builds come before the
/// source build. The cursor is cloned whenever the search branches so a
/// backtracked path resumes from the next candidate, not from scratch.
#[derive(Clone, Debug)]
pub struct RepositoryPackageIterator {
    package_name: PkgName,
    repos: Vec<Arc<dyn PackageRepo>>,
    candidates: Option<VecDeque<(Arc<Spec>, usize)>>,
}

impl RepositoryPackageIterator {
    pub fn new(package_name: PkgName, repos: Vec<Arc<dyn PackageRepo>>) -> Self {
        RepositoryPackageIterator {
            package_name,
            repos,
            candidates: None,
        }
    }

    /// Advance to the next candidate spec, if any remain.
    pub fn next_candidate(&mut self) -> Result<Option<(Arc<Spec>, PackageSource)>> {
        if self.candidates.is_none() {
            self.candidates = Some(self.build_candidates()?);
        }
        let candidates = self.candidates.as_mut().expect("candidates were just built");
        match candidates.pop_front() {
            Some((spec, repo_index)) => {
                let source = PackageSource::Repository(self.repos[repo_index].clone());
                Ok(Some((spec, source)))
            }
            None => Ok(None),
        }
    }

    fn build_candidates(&self) -> Result<VecDeque<(Arc<Spec>, usize)>> {
        let mut versions: Vec<(Version, usize)> = Vec::new();
        for (repo_index, repo) in self.repos.iter().enumerate() {
            for version in repo.list_package_versions(&self.package_name)? {
                versions.push((version, repo_index));
            }
        }
        // registration order is the primary key; versions descend within
        // each repository
        versions.sort_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)));

        let mut candidates = VecDeque::new();
        for (version, repo_index) in versions {
            let repo = &self.repos[repo_index];
            let pkg = Ident::with_version(self.package_name.clone(), version);
            let mut builds = repo.list_package_builds(&pkg)?;
            builds.sort_by_key(build_sort_key);
            for build in builds {
                match repo.read_spec(&build) {
                    Ok(spec) => candidates.push_back((Arc::new(spec), repo_index)),
                    Err(Error::PackageNotFound(_)) => continue,
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(candidates)
    }
}

/// Binary builds sort before the source build; among binaries the digest
/// string gives a stable order.
fn build_sort_key(pkg: &Ident) -> (bool, String) {
    (
        pkg.is_source(),
        pkg.build
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
    )
}
