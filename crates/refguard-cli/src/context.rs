use std::env;
use std::path::{Path, PathBuf};

use refguard::{Engine, LoadedConfig, load_config};

use crate::error::CliError;

/// Directory under the project that receives audit logs unless `--logs` is given.
pub const DEFAULT_LOG_DIR: &str = "_maintainers/logs";
pub const DEFAULT_ROOT: &str = "docs";

#[derive(Clone, Copy, Debug, Default)]
pub struct Verbosity {
    pub json: bool,
    pub verbose: bool,
}

/// Everything a command needs that is shared across subcommands: the project
/// directory, the loaded configuration, and output preferences.
pub struct CliSession {
    pub project: PathBuf,
    pub config: LoadedConfig,
    pub verbosity: Verbosity,
}

impl CliSession {
    pub fn bootstrap(
        project_override: Option<String>,
        config_override: Option<String>,
        verbosity: Verbosity,
    ) -> Result<Self, CliError> {
        let project = match project_override {
            Some(path) => PathBuf::from(path),
            None => env::current_dir()?,
        };
        let explicit = config_override.map(PathBuf::from);
        let config = load_config(&project, explicit.as_deref())?;

        Ok(Self {
            project,
            config,
            verbosity,
        })
    }

    /// Resolves a corpus root argument against the project directory.
    pub fn corpus_root(&self, root: Option<&String>) -> PathBuf {
        self.resolve(Path::new(root.map(String::as_str).unwrap_or(DEFAULT_ROOT)))
    }

    pub fn log_dir(&self, logs: Option<&String>) -> PathBuf {
        match logs {
            Some(dir) => PathBuf::from(dir),
            None => self.project.join(DEFAULT_LOG_DIR),
        }
    }

    pub fn engine(&self, root: &Path) -> Result<Engine, CliError> {
        Ok(Engine::open(root, self.config.config.clone())?)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project.join(path)
        }
    }
}
