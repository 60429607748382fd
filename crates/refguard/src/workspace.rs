use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RefguardError;

/// Corpus layout knobs. All of this is configuration; nothing in the resolver
/// hardcodes a directory name.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorpusSettings {
    /// Subdirectories of the root to scan. Empty means the whole root.
    pub content_dirs: Vec<String>,
    /// Directory name whose contents are Partial documents.
    pub partials_dir: String,
    /// Entry-name prefixes that mark configuration or hidden files.
    pub reserved_prefixes: Vec<String>,
    /// Recognised Markdown extensions, without the dot, in probe order.
    pub extensions: Vec<String>,
    /// First-segment aliases for root-absolute paths (`/service/x` -> `/services/x`).
    pub absolute_aliases: BTreeMap<String, String>,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            content_dirs: Vec::new(),
            partials_dir: "_partials".to_string(),
            reserved_prefixes: vec!["_".to_string(), ".".to_string()],
            extensions: vec!["md".to_string(), "mdx".to_string()],
            absolute_aliases: BTreeMap::from([("service".to_string(), "services".to_string())]),
        }
    }
}

/// Canonical root of a content corpus plus the settings that describe its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    root: PathBuf,
    settings: CorpusSettings,
}

impl CorpusLayout {
    /// Opens a corpus rooted at `root`. The only fatal condition of a run is a root
    /// that does not exist or is not a directory.
    pub fn open(root: impl AsRef<Path>, settings: CorpusSettings) -> Result<Self, RefguardError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(RefguardError::CorpusRootMissing(root.to_path_buf()));
        }
        let root = fs::canonicalize(root)?;
        Ok(Self { root, settings })
    }

    /// Returns the canonical corpus root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &CorpusSettings {
        &self.settings
    }

    /// Directories the scanner walks, in configuration order.
    pub fn scan_dirs(&self) -> Vec<PathBuf> {
        if self.settings.content_dirs.is_empty() {
            return vec![self.root.clone()];
        }
        self.settings
            .content_dirs
            .iter()
            .map(|dir| self.root.join(dir.trim_matches('/')))
            .collect()
    }

    /// Whether `path` sits somewhere below a partials directory.
    pub fn is_partial_path(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .parent()
            .map(|parent| {
                parent.components().any(|c| {
                    matches!(c, Component::Normal(name) if name == self.settings.partials_dir.as_str())
                })
            })
            .unwrap_or(false)
    }

    pub fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.settings.extensions.iter().any(|known| known == ext))
            .unwrap_or(false)
    }

    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.settings
            .reserved_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
    }

    /// Resolves a content-root-absolute path (`/services/x.md`) against the corpus root,
    /// applying first-segment aliases.
    pub fn resolve_root_absolute(&self, target: &str) -> PathBuf {
        let trimmed = target.trim_start_matches('/');
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (trimmed, None),
        };
        let first = self
            .settings
            .absolute_aliases
            .get(first)
            .map(String::as_str)
            .unwrap_or(first);

        let mut resolved = self.root.join(first);
        if let Some(rest) = rest {
            resolved.push(rest);
        }
        normalize_path_lexical(&resolved)
    }

    /// Corpus-relative, forward-slash rendering used in reports.
    pub fn display_path(&self, path: &Path) -> String {
        relative_display(&self.root, path)
    }
}

/// Forward-slash path of `path` relative to `root`, falling back to the full path.
pub fn relative_display(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Removes `.` and resolves `..` components without touching the filesystem.
pub fn normalize_path_lexical(path: &Path) -> PathBuf {
    let mut anchored = PathBuf::new();
    let mut parts: Vec<OsString> = Vec::new();
    let mut is_anchored = false;

    for component in path.components() {
        match component {
            component @ (Component::Prefix(_) | Component::RootDir) => {
                anchored.push(component.as_os_str());
                is_anchored = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() && !is_anchored {
                    parts.push(OsString::from(".."));
                }
            }
            Component::Normal(s) => parts.push(s.to_os_string()),
        }
    }

    for part in parts {
        anchored.push(part);
    }

    anchored
}

/// Lexical relative path from directory `from` to `to`, forward-slash separated.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from = normalize_path_lexical(from);
    let to = normalize_path_lexical(to);
    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        segments.push("..".to_string());
    }
    for part in &to_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}
