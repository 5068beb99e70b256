//! Graph-based backtracking dependency solver.

pub use self::graph::{
    Change, Decision, Graph, Node, Note, OutOfOptions, State, DEAD_STATE,
};
pub use self::package_iterator::RepositoryPackageIterator;
pub use self::solution::{PackageSource, SolvedRequest, Solution};
pub use self::solver::Solver;
pub use self::validation::{default_validators, BinaryOnlyValidator, Validator};

mod graph;
mod package_iterator;
mod solution;
mod solver;
mod validation;

#[cfg(test)]
#[path = "./solve_test.rs"]
mod solve_test;
