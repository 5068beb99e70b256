use std::fmt::{self, Display, Formatter};

/// The result of a compatibility check: either compatible, or a
/// human-readable reason why not.
///
/// Incompatibility is data consumed by the solver to prune candidates,
/// never an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Compatibility {
    Compatible,
    Incompatible(String),
}

impl Compatibility {
    pub fn incompatible<S: Into<String>>(reason: S) -> Self {
        Compatibility::Incompatible(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

impl Display for Compatibility {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Compatibility::Compatible => f.write_str("compatible"),
            Compatibility::Incompatible(reason) => f.write_str(reason),
        }
    }
}
