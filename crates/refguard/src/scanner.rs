use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use serde::Serialize;

use crate::workspace::CorpusLayout;

const BINARY_CHECK_BYTES: usize = 8192;

/// Whether a document is a transcluded fragment or an independently routed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Partial,
    Regular,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentEntry {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

/// Result of a corpus walk.
#[derive(Debug, Clone, Default)]
pub struct CorpusScan {
    /// Content files in path order.
    pub entries: Vec<DocumentEntry>,
    /// Configured content subdirectories that were not present.
    pub missing_dirs: Vec<PathBuf>,
}

impl CorpusScan {
    pub fn partial_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == DocumentKind::Partial)
            .count()
    }
}

/// Walks every configured content directory and classifies Markdown files.
///
/// Missing subdirectories are recorded and skipped. Entries whose name starts with a
/// reserved prefix are pruned, except inside a partials directory.
pub fn scan_corpus(layout: &CorpusLayout) -> CorpusScan {
    let mut scan = CorpusScan::default();
    let mut seen = BTreeSet::new();

    for dir in layout.scan_dirs() {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "content subdirectory missing; skipping");
            scan.missing_dirs.push(dir);
            continue;
        }

        let filter_layout = layout.clone();
        let walker = WalkBuilder::new(&dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| keep_entry(&filter_layout, entry))
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read corpus entry");
                    continue;
                }
            };
            let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
            if !is_file || !layout.is_markdown(entry.path()) || is_binary(entry.path()) {
                continue;
            }
            seen.insert(entry.into_path());
        }
    }

    scan.entries = seen
        .into_iter()
        .map(|path| {
            let kind = if layout.is_partial_path(&path) {
                DocumentKind::Partial
            } else {
                DocumentKind::Regular
            };
            DocumentEntry { path, kind }
        })
        .collect();

    tracing::info!(
        files = scan.entries.len(),
        partials = scan.partial_count(),
        "scanned corpus"
    );
    scan
}

fn keep_entry(layout: &CorpusLayout, entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if within_partials(layout, entry.path()) {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !layout.is_reserved_name(&name)
}

fn within_partials(layout: &CorpusLayout, path: &Path) -> bool {
    let partials = layout.settings().partials_dir.as_str();
    path.strip_prefix(layout.root())
        .unwrap_or(path)
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == partials))
}

/// Check first few bytes for nulls to determine if file is binary
fn is_binary(path: &Path) -> bool {
    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buffer = [0; BINARY_CHECK_BYTES];
    let n = match file.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return false,
    };

    buffer[..n].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::CorpusSettings;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn classifies_partials_and_skips_reserved_entries() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "a/page.md", "# A");
        touch(root, "a/_hidden.md", "# hidden");
        touch(root, "_maintainers/notes.md", "# notes");
        touch(root, "ref/_partials/_note.mdx", "note");
        touch(root, "ref/_partials/nested/tip.md", "tip");
        touch(root, "ref/_config.yml", "include: []");
        touch(root, "ref/image.png", "png");

        let layout = CorpusLayout::open(root, CorpusSettings::default()).unwrap();
        let scan = scan_corpus(&layout);

        let rel: Vec<(String, DocumentKind)> = scan
            .entries
            .iter()
            .map(|e| (layout.display_path(&e.path), e.kind))
            .collect();
        assert_eq!(
            rel,
            vec![
                ("a/page.md".to_string(), DocumentKind::Regular),
                ("ref/_partials/_note.mdx".to_string(), DocumentKind::Partial),
                ("ref/_partials/nested/tip.md".to_string(), DocumentKind::Partial),
            ]
        );
    }

    #[test]
    fn missing_content_dirs_are_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "present/page.mdx", "hello");
        let settings = CorpusSettings {
            content_dirs: vec!["present".into(), "absent".into()],
            ..CorpusSettings::default()
        };
        let layout = CorpusLayout::open(dir.path(), settings).unwrap();
        let scan = scan_corpus(&layout);

        assert_eq!(scan.entries.len(), 1);
        assert_eq!(scan.missing_dirs.len(), 1);
        assert!(scan.missing_dirs[0].ends_with("absent"));
    }

    #[test]
    fn binary_markdown_files_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("blob.md"), [0u8, 1, 2, 3]).unwrap();
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        assert!(scan_corpus(&layout).entries.is_empty());
    }
}
