//! Error and result types used across the crate.

use std::io;

use thiserror::Error;

use crate::api::Ident;
use crate::encoding::Digest;
use crate::solve::OutOfOptions;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] hex::FromHexError),

    /// A blob or other stored object was requested but is not present.
    #[error("unknown object: {0}")]
    UnknownObject(Digest),
    /// A tag or digest string did not resolve to any stored object.
    #[error("unknown reference: {0}")]
    UnknownReference(String),
    #[error("unknown runtime: {0}")]
    UnknownRuntime(String),
    /// Stored content did not hash to the digest that names it.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: Digest, actual: Digest },

    #[error("invalid package name: {0}")]
    InvalidName(String),
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    #[error("invalid build: {0}")]
    InvalidBuild(String),
    #[error("invalid identifier: {0}")]
    InvalidIdent(String),

    #[error("package not found: {0}")]
    PackageNotFound(Ident),
    #[error("no package repositories have been configured")]
    NoRepositories,
    /// All candidates for a package were exhausted; consumed by the
    /// solver loop as a backtrack trigger.
    #[error("out of options for package '{}'", .0.request.pkg.name)]
    OutOfOptions(Box<OutOfOptions>),
    #[error("failed to resolve: {0}")]
    FailedToResolve(String),

    #[error("{0}")]
    String(String),
}

impl Error {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Error::String(message.into())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::String(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::String(message.to_string())
    }
}
