use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RefguardError;
use crate::workspace::CorpusSettings;

/// Config files probed under the project directory, highest precedence first.
pub const CONFIG_CANDIDATES: [&str; 2] = [
    "_maintainers/link-replacements.yaml",
    "link-replacements.yaml",
];

/// Parsed view of the refguard YAML configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RefguardConfig {
    pub corpus: CorpusSettings,
    /// Exact-match table `old path -> new url`.
    pub replacements: BTreeMap<String, String>,
    /// Ordered pattern rewrites; the first matching rule wins.
    pub patterns: Vec<PatternRule>,
    /// Extra link-repair rules tried before the built-in migration table.
    pub repairs: Vec<RepairRule>,
    pub components: ComponentSettings,
    pub images: ImageSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PatternRule {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default, rename = "extractPath", alias = "extract_path")]
    pub extract_path: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RepairRule {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ComponentSettings {
    /// Import sources whose identifiers are not available in the target site.
    pub modules: Vec<String>,
    /// Subset of `modules` whose imports are constants rather than components.
    pub constant_modules: Vec<String>,
}

impl Default for ComponentSettings {
    fn default() -> Self {
        Self {
            modules: vec![
                "@site/src/components/".to_string(),
                "@site/src/plugins/".to_string(),
            ],
            constant_modules: vec!["@site/src/plugins/".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Module prefix used inside `require(...)` calls.
    pub module_prefix: String,
    /// Site-relative prefix used for plain image URLs.
    pub site_prefix: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            module_prefix: "@site/static/img".to_string(),
            site_prefix: "/img".to_string(),
        }
    }
}

/// Configuration together with the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: RefguardConfig,
    pub source: Option<PathBuf>,
}

/// Loads configuration for a run.
///
/// An explicit path must exist and parse. Without one, the first candidate from
/// [`CONFIG_CANDIDATES`] found under `project` is used; a missing file degrades to the
/// default (empty) rule set and an unparsable discovered file is skipped with a warning.
pub fn load_config(project: &Path, explicit: Option<&Path>) -> Result<LoadedConfig, RefguardError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(RefguardError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let config = read_config(path).map_err(|err| err.context(path.display()))?;
        return Ok(LoadedConfig {
            config,
            source: Some(path.to_path_buf()),
        });
    }

    for candidate in CONFIG_CANDIDATES {
        let path = project.join(candidate);
        if !path.is_file() {
            continue;
        }
        match read_config(&path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded configuration");
                return Ok(LoadedConfig {
                    config,
                    source: Some(path),
                });
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable configuration");
                return Ok(LoadedConfig::default());
            }
        }
    }

    tracing::debug!(project = %project.display(), "no configuration found; using empty rule set");
    Ok(LoadedConfig::default())
}

/// Parses a single YAML document. Empty and comment-only files yield the defaults.
pub fn parse_config(content: &str) -> Result<RefguardConfig, RefguardError> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    if value.is_null() {
        return Ok(RefguardConfig::default());
    }
    Ok(serde_yaml::from_value(value)?)
}

fn read_config(path: &Path) -> Result<RefguardConfig, RefguardError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("# nothing here\n").unwrap();
        assert!(config.replacements.is_empty());
        assert!(config.patterns.is_empty());
        assert_eq!(config.corpus.partials_dir, "_partials");
        assert_eq!(config.images.site_prefix, "/img");
    }

    #[test]
    fn parses_replacements_and_patterns() {
        let yaml = r#"
replacements:
  /old/page: /new/page
patterns:
  - pattern: /api/.+
    replacement: /reference/
    extractPath: true
  - pattern: /developer-tools/dashboard
    replacement: dashboard/dashboard-placeholder.md
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(
            config.replacements.get("/old/page").map(String::as_str),
            Some("/new/page")
        );
        assert_eq!(config.patterns.len(), 2);
        assert!(config.patterns[0].extract_path);
        assert!(!config.patterns[1].extract_path);
    }

    #[test]
    fn maintainers_file_takes_precedence_over_root_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("_maintainers")).unwrap();
        fs::write(
            dir.path().join("_maintainers/link-replacements.yaml"),
            "replacements:\n  /a: /from-maintainers\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("link-replacements.yaml"),
            "replacements:\n  /a: /from-root\n",
        )
        .unwrap();

        let loaded = load_config(dir.path(), None).unwrap();
        assert_eq!(
            loaded.config.replacements.get("/a").map(String::as_str),
            Some("/from-maintainers")
        );
        assert!(loaded.source.unwrap().ends_with("_maintainers/link-replacements.yaml"));
    }

    #[test]
    fn missing_config_is_not_an_error() {
        let dir = tempdir().unwrap();
        let loaded = load_config(dir.path(), None).unwrap();
        assert!(loaded.source.is_none());
        assert!(loaded.config.replacements.is_empty());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_config(dir.path(), Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, RefguardError::Config(_)));
    }
}
