//! Package API types: identifiers, versions, builds, requests and specs.

pub use self::build::{parse_build, Build};
pub use self::compat::Compatibility;
pub use self::ident::{parse_ident, Ident};
pub use self::name::PkgName;
pub use self::option_map::OptionMap;
pub use self::request::{parse_version_filter, PkgRequest, RangeIdent, Request, VarRequest, VersionFilter};
pub use self::spec::{BuildSpec, InstallSpec, Opt, PkgOpt, Spec, VarOpt};
pub use self::version::{parse_version, Version};

mod build;
mod compat;
mod ident;
mod name;
mod option_map;
mod request;
mod spec;
mod version;
