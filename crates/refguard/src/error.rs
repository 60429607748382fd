use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// High-level error type shared across refguard components.
///
/// Only a missing corpus root and an explicitly requested configuration file that
/// cannot be loaded are fatal to a run; every other failure is absorbed into the run
/// report.
#[derive(Debug, Error)]
pub enum RefguardError {
    #[error("corpus root not found: {0}")]
    CorpusRootMissing(PathBuf),
    #[error("config error: {0}")]
    Config(String),
    #[error("pattern error: {0}")]
    Pattern(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RefguardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RefguardError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<regex::Error> for RefguardError {
    fn from(err: regex::Error) -> Self {
        Self::Pattern(err.to_string())
    }
}

impl RefguardError {
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        match self {
            RefguardError::CorpusRootMissing(path) => RefguardError::CorpusRootMissing(path),
            RefguardError::Config(msg) => RefguardError::Config(format!("{ctx}: {msg}")),
            RefguardError::Pattern(msg) => RefguardError::Pattern(format!("{ctx}: {msg}")),
            RefguardError::Serialization(msg) => {
                RefguardError::Serialization(format!("{ctx}: {msg}"))
            }
            RefguardError::Io(err) => RefguardError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_config_messages() {
        let err = RefguardError::Config("bad key".into()).context("link-replacements.yaml");
        assert_eq!(err.to_string(), "config error: link-replacements.yaml: bad key");
    }

    #[test]
    fn context_keeps_root_path_untouched() {
        let err = RefguardError::CorpusRootMissing(PathBuf::from("docs")).context("scan");
        assert!(matches!(err, RefguardError::CorpusRootMissing(p) if p == PathBuf::from("docs")));
    }
}
