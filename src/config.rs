//! Process-wide configuration for storage locations.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;

use crate::storage::{ensure_repository, Repository};
use crate::Result;

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

const ROOT_ENV: &str = "STRATA_STORAGE_ROOT";
const REMOTE_ENV_PREFIX: &str = "STRATA_REMOTE_";

static CONFIG: OnceCell<RwLock<Arc<Config>>> = OnceCell::new();

/// Serializes tests that replace the process-wide configuration.
#[cfg(test)]
pub(crate) static CONFIG_TEST_LOCK: once_cell::sync::Lazy<std::sync::Mutex<()>> =
    once_cell::sync::Lazy::new(|| std::sync::Mutex::new(()));

/// Configuration for the local repository and its known remotes.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory of the local repository.
    pub storage_root: PathBuf,
    /// Named remote repositories, by root directory.
    pub remotes: BTreeMap<String, PathBuf>,
}

impl Config {
    /// Builds a configuration from the process environment.
    ///
    /// The storage root comes from `STRATA_STORAGE_ROOT`, falling back to
    /// `.strata` under the user's home directory. Each `STRATA_REMOTE_<NAME>`
    /// variable declares a remote named `<name>` rooted at its value.
    pub fn from_environment() -> Self {
        let storage_root = std::env::var_os(ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
                home.join(".strata")
            });

        let mut remotes = BTreeMap::new();
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix(REMOTE_ENV_PREFIX) {
                remotes.insert(name.to_lowercase(), PathBuf::from(value));
            }
        }

        Config {
            storage_root,
            remotes,
        }
    }

    /// Opens the configured local repository, creating it if necessary.
    pub fn get_repository(&self) -> Result<Repository> {
        ensure_repository(&self.storage_root)
    }

    /// Opens the named remote repository.
    pub fn get_remote(&self, name: &str) -> Result<Repository> {
        let root = self
            .remotes
            .get(name)
            .ok_or_else(|| crate::Error::UnknownReference(format!("remote: {}", name)))?;
        ensure_repository(root)
    }

    /// Returns the names of all configured remotes.
    pub fn list_remote_names(&self) -> Vec<String> {
        self.remotes.keys().cloned().collect()
    }
}

/// Returns the current process configuration, loading it on first use.
pub fn get_config() -> Arc<Config> {
    let lock = CONFIG.get_or_init(|| RwLock::new(Arc::new(Config::from_environment())));
    lock.read().expect("config lock poisoned").clone()
}

/// Replaces the process configuration, returning the previous one.
pub fn load_config(config: Config) -> Arc<Config> {
    let lock = CONFIG.get_or_init(|| RwLock::new(Arc::new(Config::from_environment())));
    let mut slot = lock.write().expect("config lock poisoned");
    std::mem::replace(&mut *slot, Arc::new(config))
}
