//! Resolution of layer refs into packages, environments and mount options.

use std::collections::HashMap;

use crate::storage::{Layer, Object, Repository, Runtime};
use crate::Result;

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// Expand a list of layer refs into the flattened, ordered package list.
///
/// Platforms are expanded depth-first in stack order. Duplicates are kept;
/// the union mount's last-wins semantics take care of any overlap.
pub fn resolve_layers_to_packages<S: AsRef<str>>(
    repo: &Repository,
    layers: &[S],
) -> Result<Vec<Layer>> {
    let mut packages = Vec::new();
    for reference in layers {
        match repo.read_ref(reference.as_ref())? {
            Object::Layer(layer) => packages.push(layer),
            Object::Platform(platform) => {
                let refs: Vec<String> = platform.stack.iter().map(|d| d.to_string()).collect();
                packages.extend(resolve_layers_to_packages(repo, &refs)?);
            }
            Object::Runtime(runtime) => {
                let expanded = resolve_layers_to_packages(repo, &runtime.config.layers)?;
                packages.extend(expanded);
            }
        }
    }
    Ok(packages)
}

/// Fold package environments into a single map, later packages winning
/// on key collisions.
pub fn resolve_packages_to_environment(packages: &[Layer]) -> HashMap<String, String> {
    let mut env = HashMap::new();
    for package in packages {
        for (name, value) in package.iter_env() {
            env.insert(name.to_string(), value.to_string());
        }
    }
    env
}

/// Compute the full environment for a runtime.
pub fn resolve_runtime_environment(
    repo: &Repository,
    runtime: &Runtime,
) -> Result<HashMap<String, String>> {
    let packages = resolve_layers_to_packages(repo, &runtime.config.layers)?;
    let mut env = resolve_packages_to_environment(&packages);
    env.insert(
        "STRATA_RUNTIME".to_string(),
        runtime.rootdir().to_string_lossy().to_string(),
    );
    Ok(env)
}

/// Build the union mount option string for a runtime.
///
/// The runtime's own lower directory is the bottom of the stack, followed
/// by each resolved package's render directory in resolved order. Paths
/// under the repository root are colon-free by construction, so no
/// escaping is applied.
pub fn resolve_overlayfs_options(repo: &Repository, runtime: &Runtime) -> Result<String> {
    let mut lowerdirs = vec![runtime.lowerdir().to_string_lossy().to_string()];
    let packages = resolve_layers_to_packages(repo, &runtime.config.layers)?;
    for package in &packages {
        let rendered = repo.render_manifest(&package.manifest)?;
        lowerdirs.push(rendered.to_string_lossy().to_string());
    }

    Ok(format!(
        "lowerdir={},upperdir={},workdir={}",
        lowerdirs.join(":"),
        runtime.upperdir().to_string_lossy(),
        runtime.workdir().to_string_lossy(),
    ))
}
