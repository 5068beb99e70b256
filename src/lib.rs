//! Layered content-addressable file storage with a package solver.
//!
//! The storage half tracks directory trees as hash-identified blobs and
//! composes them into stacked runtime file systems with union-mount
//! semantics. The package half resolves a transitive set of package
//! requests into a consistent, buildable set of package specs using a
//! backtracking graph solver.

pub use self::config::{get_config, load_config, Config};
pub use self::encoding::Digest;
pub use self::error::{Error, Result};
pub use self::resolve::{
    resolve_layers_to_packages, resolve_overlayfs_options, resolve_packages_to_environment,
    resolve_runtime_environment,
};
pub use self::storage::{ensure_repository, Layer, Object, Platform, Repository, Runtime};
pub use self::sync::{pull_ref, push_ref, sync_ref};
pub use self::tracking::{compute_manifest, Manifest};

pub mod api;
pub mod config;
pub mod encoding;
pub mod repo;
pub mod resolve;
pub mod solve;
pub mod storage;
pub mod sync;
pub mod tracking;

mod error;
