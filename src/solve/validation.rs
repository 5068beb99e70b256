use std::fmt::Debug;

use super::graph::State;
use crate::api::{Compatibility, Opt, Spec};

/// A single check in the validation chain.
///
/// Validators are pure functions of the state and candidate spec; an
/// incompatible result prunes the candidate and is reported as a note.
pub trait Validator: Debug {
    fn validate(&self, state: &State, spec: &Spec) -> Compatibility;
}

/// The default chain: request range, option consistency, and
/// consistency with already-resolved dependencies.
pub fn default_validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(PkgRequestValidator),
        Box::new(OptionsValidator),
        Box::new(PkgRequirementsValidator),
    ]
}

/// Rejects candidates that would need to be built from source.
#[derive(Clone, Copy, Debug)]
pub struct BinaryOnlyValidator;

impl Validator for BinaryOnlyValidator {
    fn validate(&self, _state: &State, spec: &Spec) -> Compatibility {
        if spec.pkg.is_source() {
            return Compatibility::incompatible(
                "only binary packages are allowed, source build would be required",
            );
        }
        Compatibility::Compatible
    }
}

/// Ensures the candidate satisfies the merged request for its package.
#[derive(Clone, Copy, Debug)]
pub struct PkgRequestValidator;

impl Validator for PkgRequestValidator {
    fn validate(&self, state: &State, spec: &Spec) -> Compatibility {
        match state.get_merged_request(&spec.pkg.name) {
            Some(request) => request.is_satisfied_by(&spec.pkg),
            None => Compatibility::incompatible("package was not requested"),
        }
    }
}

/// Ensures the candidate's build options do not contradict any
/// constrained variable.
#[derive(Clone, Copy, Debug)]
pub struct OptionsValidator;

impl Validator for OptionsValidator {
    fn validate(&self, state: &State, spec: &Spec) -> Compatibility {
        for request in state.var_requests() {
            for opt in &spec.build.options {
                let var = match opt {
                    Opt::Var(var) => var,
                    Opt::Pkg(_) => continue,
                };
                if var.var != request.var || var.default.is_empty() {
                    continue;
                }
                if var.default != request.value {
                    return Compatibility::incompatible(format!(
                        "build option {}={} does not match requested {}",
                        var.var, var.default, request.value
                    ));
                }
            }
        }
        Compatibility::Compatible
    }
}

/// Ensures the candidate's runtime requirements are consistent with the
/// packages already resolved in this state.
#[derive(Clone, Copy, Debug)]
pub struct PkgRequirementsValidator;

impl Validator for PkgRequirementsValidator {
    fn validate(&self, state: &State, spec: &Spec) -> Compatibility {
        for requirement in spec.install.pkg_requirements() {
            let (resolved, _) = match state.get_current_resolve(&requirement.pkg.name) {
                Some(found) => found,
                None => continue,
            };
            let compat = requirement.is_satisfied_by(&resolved.pkg);
            if !compat.is_ok() {
                return Compatibility::incompatible(format!(
                    "conflicts with resolved {}: {}",
                    resolved.pkg, compat
                ));
            }
        }
        Compatibility::Compatible
    }
}
