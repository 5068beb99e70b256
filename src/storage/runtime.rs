use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CONFIG_FILE: &str = "config";
const UPPER_SUBDIR: &str = "upper";
const WORK_SUBDIR: &str = "work";
const LOWER_SUBDIR: &str = "lower";
const ROOT_SUBDIR: &str = "root";

/// Persisted state of a runtime: the ordered stack of layer refs that
/// make up its base file system.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub layers: Vec<String>,
}

/// A mutable working environment backed by a union mount of layers.
///
/// Runtimes are not content-addressed; each one is identified by a
/// freshly generated ID and lives until explicitly removed.
#[derive(Clone, Debug)]
pub struct Runtime {
    root: PathBuf,
    pub id: String,
    pub config: RuntimeConfig,
}

impl Runtime {
    fn new(root: PathBuf, id: String) -> Self {
        Runtime {
            root,
            id,
            config: RuntimeConfig::default(),
        }
    }

    /// Directory where the union mount presents the merged file system.
    pub fn rootdir(&self) -> PathBuf {
        self.root.join(ROOT_SUBDIR)
    }

    /// Directory holding this runtime's working file changes.
    pub fn upperdir(&self) -> PathBuf {
        self.root.join(UPPER_SUBDIR)
    }

    pub fn workdir(&self) -> PathBuf {
        self.root.join(WORK_SUBDIR)
    }

    /// The runtime's own base lower directory, always the bottom of the
    /// mount stack.
    pub fn lowerdir(&self) -> PathBuf {
        self.root.join(LOWER_SUBDIR)
    }

    /// Append a layer ref to this runtime's stack and persist the change.
    pub fn append_layer<S: Into<String>>(&mut self, reference: S) -> Result<()> {
        self.config.layers.push(reference.into());
        self.save_config()
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn save_config(&self) -> Result<()> {
        super::layer::persist_json(&self.config, &self.config_path(), &self.root)
    }

    fn load_config(&mut self) -> Result<()> {
        let file = std::fs::File::open(self.config_path())?;
        self.config = serde_json::from_reader(file)?;
        Ok(())
    }
}

/// Filesystem storage of runtime working directories.
#[derive(Clone, Debug)]
pub struct RuntimeStorage {
    root: PathBuf,
}

impl RuntimeStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        RuntimeStorage { root: root.into() }
    }

    /// Create a new empty runtime under a freshly generated ID.
    pub fn create_runtime(&self) -> Result<Runtime> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let runtime_dir = self.root.join(&id);
        std::fs::create_dir_all(&runtime_dir)?;
        for subdir in &[UPPER_SUBDIR, WORK_SUBDIR, LOWER_SUBDIR, ROOT_SUBDIR] {
            std::fs::create_dir(runtime_dir.join(subdir))?;
        }
        let runtime = Runtime::new(runtime_dir, id);
        runtime.save_config()?;
        Ok(runtime)
    }

    pub fn read_runtime<S: AsRef<str>>(&self, id: S) -> Result<Runtime> {
        let runtime_dir = self.root.join(id.as_ref());
        if !runtime_dir.is_dir() {
            return Err(Error::UnknownRuntime(id.as_ref().to_string()));
        }
        let mut runtime = Runtime::new(runtime_dir, id.as_ref().to_string());
        runtime.load_config()?;
        Ok(runtime)
    }

    /// Tear down the given runtime, removing all of its working files.
    pub fn remove_runtime<S: AsRef<str>>(&self, id: S) -> Result<()> {
        let runtime_dir = self.root.join(id.as_ref());
        if !runtime_dir.is_dir() {
            return Err(Error::UnknownRuntime(id.as_ref().to_string()));
        }
        std::fs::remove_dir_all(&runtime_dir)?;
        Ok(())
    }

    pub fn iter_runtimes(&self) -> Result<Vec<Runtime>> {
        let mut runtimes = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                runtimes.push(self.read_runtime(entry.file_name().to_string_lossy())?);
            }
        }
        Ok(runtimes)
    }
}
