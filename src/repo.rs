//! Package repositories: where the solver finds specs and builds.

pub use self::mem::MemRepo;
pub use self::store::StoreRepo;

use std::fmt::Debug;

use crate::api::{Ident, PkgName, Spec, Version};
use crate::encoding::Digest;
use crate::Result;

mod mem;
mod store;

/// A source of package specs and published builds.
pub trait PackageRepo: Debug + Send + Sync {
    /// List the names of all packages in this repository.
    fn list_package_names(&self) -> Result<Vec<PkgName>>;

    /// List the available versions of the named package.
    fn list_package_versions(&self, name: &PkgName) -> Result<Vec<Version>>;

    /// List the builds of the given package version.
    ///
    /// Binary builds are reported from published packages; the source
    /// build is reported whenever a version spec exists.
    fn list_package_builds(&self, pkg: &Ident) -> Result<Vec<Ident>>;

    /// Read the spec for the given package.
    ///
    /// With no build, this is the version spec. With a source build, the
    /// version spec is returned stamped with the source build. With a
    /// binary build, the stored build spec is returned.
    fn read_spec(&self, pkg: &Ident) -> Result<Spec>;

    /// The stored layer digest of a published binary build.
    fn get_package(&self, pkg: &Ident) -> Result<Digest>;

    /// Publish a version spec to this repository.
    fn publish_spec(&mut self, spec: Spec) -> Result<()>;

    /// Publish a binary build along with the layer that contains it.
    fn publish_package(&mut self, spec: Spec, digest: Digest) -> Result<()>;
}
