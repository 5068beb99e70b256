use std::sync::Arc;

use super::graph::{Change, Decision, Graph, Note, OutOfOptions, State, DEAD_STATE};
use super::package_iterator::RepositoryPackageIterator;
use super::solution::{PackageSource, Solution};
use super::validation::{default_validators, BinaryOnlyValidator, Validator};
use crate::api::{Build, Compatibility, Opt, OptionMap, PkgName, Request, Spec};
use crate::repo::PackageRepo;
use crate::{Error, Result};

/// The main entry point for resolving a set of package requests.
#[derive(Debug)]
pub struct Solver {
    repos: Vec<Arc<dyn PackageRepo>>,
    initial_state_builders: Vec<Change>,
    validators: Vec<Box<dyn Validator>>,
}

impl Default for Solver {
    fn default() -> Self {
        Solver {
            repos: Vec::new(),
            initial_state_builders: Vec::new(),
            validators: default_validators(),
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put this solver back into its default state.
    pub fn reset(&mut self) {
        self.repos.clear();
        self.initial_state_builders.clear();
        self.validators = default_validators();
    }

    /// Add a repository where the solver can get packages.
    pub fn add_repository(&mut self, repo: Arc<dyn PackageRepo>) {
        self.repos.push(repo);
    }

    /// Add a request to this solver.
    pub fn add_request<R: Into<Request>>(&mut self, request: R) {
        let change = match request.into() {
            Request::Pkg(request) => Change::RequestPackage(request),
            Request::Var(request) => Change::RequestVar(request),
        };
        self.initial_state_builders.push(change);
    }

    /// If true, only solve pre-built binary packages.
    ///
    /// When false, the solver may return packages where the build is not
    /// yet available. These packages are known to have a source package,
    /// and their build environments are fully resolved and included in
    /// the solution.
    pub fn set_binary_only(&mut self, binary_only: bool) {
        self.validators = default_validators();
        if binary_only {
            self.validators.insert(0, Box::new(BinaryOnlyValidator));
        }
    }

    pub fn update_options(&mut self, options: OptionMap) {
        self.initial_state_builders.push(Change::SetOptions(options));
    }

    pub fn get_initial_state(&self) -> Arc<State> {
        let mut state = Arc::new(State::default());
        for change in &self.initial_state_builders {
            state = change.apply(&state);
        }
        state
    }

    /// Adds requests for all build requirements of the given spec and
    /// solves.
    pub fn solve_build_environment(&mut self, spec: &Spec) -> Result<Solution> {
        let state = self.get_initial_state();
        let build_options = spec.resolve_all_options(&state.get_option_map());
        for opt in &spec.build.options {
            if let Opt::Pkg(pkg_opt) = opt {
                let given = build_options.get(pkg_opt.pkg.as_str()).map(String::as_str);
                let request = pkg_opt.to_request(given)?;
                self.add_request(request);
            }
        }
        self.solve()
    }

    /// Run the search to completion, returning the solution or an error
    /// when no consistent resolution exists.
    pub fn solve(&mut self) -> Result<Solution> {
        let initial_state = self.get_initial_state();
        if initial_state.pkg_requests().is_empty() {
            return initial_state.as_solution();
        }

        let mut graph = Graph::new();
        let mut history: Vec<u64> = Vec::new();
        let mut current_id = graph.root_id;
        let mut decision = Some(Decision::new(self.initial_state_builders.clone()));
        let mut failed_request: Option<PkgName> = None;

        while let Some(current_decision) = decision.take() {
            current_id = graph.add_branch(current_id, &current_decision)?;
            if let Some(name) = failed_request.take() {
                graph.node_mut(current_id).forget_iterator(&name);
            }
            if Arc::ptr_eq(&graph.node(current_id).state, &DEAD_STATE) {
                break;
            }

            match self.step_state(&mut graph, current_id) {
                Ok(next) => {
                    history.push(current_id);
                    decision = next;
                }
                Err(Error::OutOfOptions(err)) => {
                    let destination = match history.pop() {
                        Some(id) => graph.node(id).state.clone(),
                        None => DEAD_STATE.clone(),
                    };
                    tracing::debug!(package = %err.request.pkg.name, "backtracking");
                    let mut step_back = Change::StepBack {
                        reason: format!("could not satisfy '{}'", err.request.pkg),
                        destination,
                    }
                    .as_decision();
                    step_back.add_notes(err.notes);
                    failed_request = Some(err.request.pkg.name.clone());
                    decision = Some(step_back);
                }
                Err(err) => {
                    let destination = match history.pop() {
                        Some(id) => graph.node(id).state.clone(),
                        None => DEAD_STATE.clone(),
                    };
                    decision = Some(
                        Change::StepBack {
                            reason: err.to_string(),
                            destination,
                        }
                        .as_decision(),
                    );
                }
            }
        }

        let final_state = graph.node(current_id).state.clone();
        if Arc::ptr_eq(&final_state, &DEAD_STATE) || *final_state == *initial_state {
            return Err(Error::FailedToResolve(
                "no solution was found for the given requests".to_string(),
            ));
        }
        final_state.as_solution()
    }

    /// Find the next decision for the given node, if any work remains.
    fn step_state(&self, graph: &mut Graph, node_id: u64) -> Result<Option<Decision>> {
        let state = graph.node(node_id).state.clone();
        let request = match state.get_next_request() {
            Some(request) => request,
            None => return Ok(None),
        };
        let mut notes: Vec<Note> = Vec::new();

        let mut iterator = match graph.node_mut(node_id).take_iterator(&request.pkg.name) {
            Some(iterator) => iterator,
            None => self.make_iterator(request.pkg.name.clone())?,
        };

        let mut decision = None;
        while let Some((candidate, source)) = iterator.next_candidate()? {
            let mut spec = candidate;
            let build_from_source = spec.pkg.is_source() && !request.pkg.is_source();
            if build_from_source {
                // Use the version spec for the build, which carries the
                // full recipe; embedded and binary specs may be stripped.
                match source.read_spec(&spec.pkg.with_build(None)) {
                    Ok(mut base) => {
                        base.pkg = base.pkg.with_build(Some(Build::Source));
                        spec = Arc::new(base);
                    }
                    Err(Error::PackageNotFound(_)) => {
                        notes.push(Note::skip(
                            spec.pkg.clone(),
                            "cannot build from source, version spec not available",
                        ));
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            }

            let compat = self.validate(&state, &spec);
            if !compat.is_ok() {
                tracing::debug!(pkg = %spec.pkg, %compat, "skipping candidate");
                notes.push(Note::skip(spec.pkg.clone(), compat));
                continue;
            }

            if build_from_source {
                let build_env = match self.resolve_new_build(&spec, &state) {
                    Ok(solution) => solution,
                    Err(err) => {
                        notes.push(Note::skip(
                            spec.pkg.clone(),
                            format!("failed to resolve build env: {}", err),
                        ));
                        continue;
                    }
                };
                // the binary this environment would produce
                let build = spec.resolve_all_options(build_env.options()).digest();
                let mut binary_spec = (*spec).clone();
                binary_spec.pkg = spec.pkg.with_build(Some(build));
                decision = Some(Decision::new(vec![Change::BuildPackage {
                    spec: Arc::new(binary_spec),
                    source: PackageSource::BuildFromSource {
                        recipe: spec.clone(),
                        build_env: Box::new(build_env),
                    },
                }]));
            } else {
                decision = Some(Decision::new(vec![Change::ResolvePackage {
                    spec: spec.clone(),
                    source,
                }]));
            }
            break;
        }

        graph
            .node_mut(node_id)
            .set_iterator(request.pkg.name.clone(), iterator);

        match decision {
            Some(mut decision) => {
                decision.add_notes(notes);
                Ok(Some(decision))
            }
            None => Err(Error::OutOfOptions(Box::new(OutOfOptions {
                request,
                notes,
            }))),
        }
    }

    fn validate(&self, state: &State, spec: &Spec) -> Compatibility {
        for validator in &self.validators {
            let compat = validator.validate(state, spec);
            if !compat.is_ok() {
                return compat;
            }
        }
        Compatibility::Compatible
    }

    fn make_iterator(&self, package_name: PkgName) -> Result<RepositoryPackageIterator> {
        if self.repos.is_empty() {
            return Err(Error::NoRepositories);
        }
        Ok(RepositoryPackageIterator::new(
            package_name,
            self.repos.clone(),
        ))
    }

    /// Spawn a fresh solver over the same repositories to resolve the
    /// build environment for the given source spec.
    fn resolve_new_build(&self, spec: &Spec, state: &State) -> Result<Solution> {
        let mut solver = Solver::new();
        solver.repos = self.repos.clone();
        solver.update_options(state.get_option_map());
        solver.solve_build_environment(spec)
    }
}
