use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::package_iterator::RepositoryPackageIterator;
use super::solution::{PackageSource, Solution};
use crate::api::{Ident, OptionMap, PkgName, PkgRequest, Request, Spec, VarRequest};
use crate::{Error, Result};

/// Sentinel state marking an unsolvable branch of the search.
pub static DEAD_STATE: Lazy<Arc<State>> = Lazy::new(|| Arc::new(State::default()));

/// An informational note attached to a decision.
#[derive(Clone, Debug)]
pub enum Note {
    SkipPackage { pkg: Ident, reason: String },
    Other(String),
}

impl Note {
    pub fn skip<R: Display>(pkg: Ident, reason: R) -> Self {
        Note::SkipPackage {
            pkg,
            reason: reason.to_string(),
        }
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Note::SkipPackage { pkg, reason } => write!(f, "skipped {}: {}", pkg, reason),
            Note::Other(message) => f.write_str(message),
        }
    }
}

/// Signal that all candidates for a package were exhausted.
///
/// Consumed by the solver loop as a backtrack trigger and only surfaced
/// when backtracking reaches the root.
#[derive(Debug)]
pub struct OutOfOptions {
    pub request: PkgRequest,
    pub notes: Vec<Note>,
}

/// A typed operation mapping one state to the next.
#[derive(Clone, Debug)]
pub enum Change {
    /// Add a package request, merging with any existing request for the
    /// same package.
    RequestPackage(PkgRequest),
    /// Constrain a build variable.
    RequestVar(VarRequest),
    /// Bulk-update the option map.
    SetOptions(OptionMap),
    /// Mark a concrete package spec resolved, adding its runtime
    /// dependencies as new requests.
    ResolvePackage {
        spec: Arc<Spec>,
        source: PackageSource,
    },
    /// Like `ResolvePackage`, for a package that will be built from
    /// source; the source records the build environment to use.
    BuildPackage {
        spec: Arc<Spec>,
        source: PackageSource,
    },
    /// Revert to an earlier state; the backtracking operation.
    StepBack {
        reason: String,
        destination: Arc<State>,
    },
}

impl Change {
    pub fn apply(&self, base: &Arc<State>) -> Arc<State> {
        match self {
            Change::RequestPackage(request) => {
                let mut next = State::clone(base);
                next.merge_request(request);
                Arc::new(next)
            }
            Change::RequestVar(request) => {
                let mut next = State::clone(base);
                next.var_requests.push(request.clone());
                next.set_option(request.var.clone(), request.value.clone());
                Arc::new(next)
            }
            Change::SetOptions(options) => {
                let mut next = State::clone(base);
                for (name, value) in options.iter() {
                    next.set_option(name.clone(), value.clone());
                }
                Arc::new(next)
            }
            Change::ResolvePackage { spec, source }
            | Change::BuildPackage { spec, source } => {
                let mut next = State::clone(base);
                next.packages.push((spec.clone(), source.clone()));
                for requirement in &spec.install.requirements {
                    match requirement {
                        Request::Pkg(request) => next.merge_request(request),
                        Request::Var(request) => {
                            next.var_requests.push(request.clone());
                            next.set_option(request.var.clone(), request.value.clone());
                        }
                    }
                }
                Arc::new(next)
            }
            Change::StepBack { destination, .. } => destination.clone(),
        }
    }

    pub fn as_decision(self) -> Decision {
        Decision::new(vec![self])
    }
}

/// An atomic batch of changes with attached informational notes.
#[derive(Clone, Debug)]
pub struct Decision {
    pub changes: Vec<Change>,
    pub notes: Vec<Note>,
}

impl Decision {
    pub fn new(changes: Vec<Change>) -> Self {
        Decision {
            changes,
            notes: Vec::new(),
        }
    }

    pub fn add_notes<I: IntoIterator<Item = Note>>(&mut self, notes: I) {
        self.notes.extend(notes);
    }

    pub fn apply(&self, base: &Arc<State>) -> Arc<State> {
        let mut state = base.clone();
        for change in &self.changes {
            state = change.apply(&state);
        }
        state
    }
}

/// The accumulated requests, constraints and resolutions at one point of
/// the search.
///
/// States are immutable snapshots: every change produces a new state.
#[derive(Clone, Debug, Default)]
pub struct State {
    pkg_requests: Vec<PkgRequest>,
    var_requests: Vec<VarRequest>,
    packages: Vec<(Arc<Spec>, PackageSource)>,
    options: Vec<(String, String)>,
}

impl State {
    fn merge_request(&mut self, request: &PkgRequest) {
        match self
            .pkg_requests
            .iter_mut()
            .find(|existing| existing.pkg.name == request.pkg.name)
        {
            Some(existing) => existing.restrict(request),
            None => self.pkg_requests.push(request.clone()),
        }
    }

    fn set_option(&mut self, name: String, value: String) {
        match self.options.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.options.push((name, value)),
        }
    }

    /// The next package request that has no resolution yet.
    pub fn get_next_request(&self) -> Option<PkgRequest> {
        self.pkg_requests
            .iter()
            .find(|request| self.get_current_resolve(&request.pkg.name).is_none())
            .cloned()
    }

    /// The merged request for the named package, if any was made.
    pub fn get_merged_request(&self, name: &PkgName) -> Option<&PkgRequest> {
        self.pkg_requests
            .iter()
            .find(|request| &request.pkg.name == name)
    }

    /// The resolved spec for the named package, if resolved.
    pub fn get_current_resolve(&self, name: &PkgName) -> Option<&(Arc<Spec>, PackageSource)> {
        self.packages
            .iter()
            .find(|(spec, _)| &spec.pkg.name == name)
    }

    pub fn get_option_map(&self) -> OptionMap {
        self.options.iter().cloned().collect()
    }

    pub fn pkg_requests(&self) -> &[PkgRequest] {
        &self.pkg_requests
    }

    pub fn var_requests(&self) -> &[VarRequest] {
        &self.var_requests
    }

    /// Build the final solution from this state.
    ///
    /// Resolved packages are emitted in topological order over their
    /// runtime dependencies, providers before consumers, ties broken by
    /// resolution order.
    pub fn as_solution(&self) -> Result<Solution> {
        let mut solution = Solution::new(self.get_option_map());
        let mut emitted: Vec<usize> = Vec::new();

        fn visit(
            state: &State,
            index: usize,
            emitted: &mut Vec<usize>,
            visiting: &mut Vec<usize>,
            solution: &mut Solution,
        ) -> Result<()> {
            if emitted.contains(&index) {
                return Ok(());
            }
            if visiting.contains(&index) {
                return Err(Error::new("dependency cycle detected in resolved packages"));
            }
            visiting.push(index);
            let (spec, _) = &state.packages[index];
            for requirement in spec.install.pkg_requirements() {
                let provider = state
                    .packages
                    .iter()
                    .position(|(s, _)| s.pkg.name == requirement.pkg.name);
                if let Some(provider) = provider {
                    visit(state, provider, emitted, visiting, solution)?;
                }
            }
            visiting.pop();
            emitted.push(index);

            let (spec, source) = &state.packages[index];
            let request = state
                .get_merged_request(&spec.pkg.name)
                .cloned()
                .unwrap_or_else(|| PkgRequest::from_ident(&spec.pkg));
            solution.add(request, spec.clone(), source.clone());
            Ok(())
        }

        for index in 0..self.packages.len() {
            visit(self, index, &mut emitted, &mut Vec::new(), &mut solution)?;
        }
        Ok(solution)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.pkg_requests == other.pkg_requests
            && self.var_requests == other.var_requests
            && self.options == other.options
            && self.packages.len() == other.packages.len()
            && self
                .packages
                .iter()
                .zip(other.packages.iter())
                .all(|((a, _), (b, _))| a.pkg == b.pkg)
    }
}

/// A node in the search graph: a state plus the candidate iterators that
/// parameterize the search below it.
#[derive(Debug)]
pub struct Node {
    pub id: u64,
    pub state: Arc<State>,
    iterators: HashMap<PkgName, RepositoryPackageIterator>,
}

impl Node {
    pub fn take_iterator(&mut self, name: &PkgName) -> Option<RepositoryPackageIterator> {
        self.iterators.remove(name)
    }

    pub fn set_iterator(&mut self, name: PkgName, iterator: RepositoryPackageIterator) {
        self.iterators.insert(name, iterator);
    }

    /// Drop the cached iterator for a package so that a later step
    /// re-enumerates its candidates from the start.
    pub fn forget_iterator(&mut self, name: &PkgName) {
        self.iterators.remove(name);
    }
}

/// The search graph; nodes only ever grow forward from the root.
#[derive(Debug)]
pub struct Graph {
    nodes: HashMap<u64, Node>,
    pub root_id: u64,
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        let root = Node {
            id: 0,
            state: Arc::new(State::default()),
            iterators: HashMap::new(),
        };
        let mut nodes = HashMap::new();
        nodes.insert(0, root);
        Graph {
            nodes,
            root_id: 0,
            next_id: 1,
        }
    }

    pub fn node(&self, id: u64) -> &Node {
        &self.nodes[&id]
    }

    pub fn node_mut(&mut self, id: u64) -> &mut Node {
        self.nodes.get_mut(&id).expect("node id must be valid")
    }

    /// Apply a decision to the identified node, producing a new node.
    ///
    /// The new node receives a clone of its parent's iterators so the
    /// search can resume from the next candidate rather than restart.
    pub fn add_branch(&mut self, source_id: u64, decision: &Decision) -> Result<u64> {
        let source = self
            .nodes
            .get(&source_id)
            .ok_or_else(|| Error::new("unknown node in solver graph"))?;
        let state = decision.apply(&source.state);
        let iterators = source.iterators.clone();
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                state,
                iterators,
            },
        );
        Ok(id)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}
