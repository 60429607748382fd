use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::document::Document;
use crate::markup::MarkupTree;
use crate::workspace::{CorpusLayout, normalize_path_lexical};

/// Read-only relation `partial -> documents importing it`, built once per run before
/// any reference is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransclusionMap {
    edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl TransclusionMap {
    /// Scans every Regular document for `import X from "<path>"` statements that point
    /// into a partials directory and records an edge for each one that lands on a loaded
    /// Partial. Imports of anything else are ignored.
    pub fn build(layout: &CorpusLayout, documents: &[Document]) -> Self {
        let partials: BTreeSet<&Path> = documents
            .iter()
            .filter(|doc| doc.is_partial())
            .map(|doc| doc.path.as_path())
            .collect();

        let mut map = TransclusionMap::default();
        for doc in documents.iter().filter(|doc| !doc.is_partial()) {
            let tree = MarkupTree::parse(&doc.content);
            for cap in import_regex().captures_iter(&doc.content) {
                let (Some(whole), Some(path)) = (cap.get(0), cap.get(2)) else {
                    continue;
                };
                if tree.is_inert(&whole.range()) || !references_partials(layout, path.as_str()) {
                    continue;
                }
                let Some(target) = resolve_import(layout, doc.dir(), path.as_str(), &partials)
                else {
                    tracing::debug!(
                        importer = %doc.path.display(),
                        import = path.as_str(),
                        "partial import does not resolve to a known partial"
                    );
                    continue;
                };
                map.edges.entry(target).or_default().insert(doc.path.clone());
            }
        }

        tracing::info!(partials = map.edges.len(), "built transclusion map");
        map
    }

    pub fn importers(&self, partial: &Path) -> impl Iterator<Item = &PathBuf> {
        self.edges.get(partial).into_iter().flatten()
    }

    pub fn is_orphan(&self, partial: &Path) -> bool {
        self.edges.get(partial).is_none_or(BTreeSet::is_empty)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &BTreeSet<PathBuf>)> {
        self.edges.iter()
    }

    /// Directories a document's relative links are resolved against: its own directory,
    /// plus every importer's directory when it is a partial.
    pub fn context_dirs(&self, doc: &Document) -> BTreeSet<PathBuf> {
        let mut dirs = BTreeSet::from([doc.dir().to_path_buf()]);
        if doc.is_partial() {
            for importer in self.importers(&doc.path) {
                if let Some(parent) = importer.parent() {
                    dirs.insert(parent.to_path_buf());
                }
            }
        }
        dirs
    }
}

pub(crate) fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s+(\w+)\s+from\s+["']([^"']+)["']"#).expect("valid import regex")
    })
}

/// Whether an import path has the partials directory as one of its segments.
pub(crate) fn references_partials(layout: &CorpusLayout, import_path: &str) -> bool {
    let partials = layout.settings().partials_dir.as_str();
    import_path.split('/').any(|segment| segment == partials)
}

fn resolve_import(
    layout: &CorpusLayout,
    importer_dir: &Path,
    import_path: &str,
    partials: &BTreeSet<&Path>,
) -> Option<PathBuf> {
    let candidate = if import_path.starts_with('/') {
        layout.resolve_root_absolute(import_path)
    } else {
        normalize_path_lexical(&importer_dir.join(import_path))
    };

    if partials.contains(candidate.as_path()) {
        return Some(candidate);
    }
    if candidate.extension().is_none() {
        for ext in &layout.settings().extensions {
            let with_ext = PathBuf::from(format!("{}.{ext}", candidate.display()));
            if partials.contains(with_ext.as_path()) {
                return Some(with_ext);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DocumentKind;
    use crate::workspace::CorpusSettings;
    use tempfile::tempdir;

    fn doc(layout: &CorpusLayout, rel: &str, kind: DocumentKind, content: &str) -> Document {
        Document::new(layout.root().join(rel), kind, content.to_string())
    }

    #[test]
    fn relative_and_absolute_imports_create_edges() {
        let dir = tempdir().unwrap();
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let docs = vec![
            doc(&layout, "services/reference/_partials/note.mdx", DocumentKind::Partial, "n"),
            doc(
                &layout,
                "services/reference/a/page.mdx",
                DocumentKind::Regular,
                "import Note from \"../_partials/note.mdx\";\n\n<Note />\n",
            ),
            doc(
                &layout,
                "services/how-to/page.mdx",
                DocumentKind::Regular,
                "import Note from '/service/reference/_partials/note.mdx';\n",
            ),
        ];

        let map = TransclusionMap::build(&layout, &docs);
        let partial = layout.root().join("services/reference/_partials/note.mdx");
        let importers: Vec<_> = map.importers(&partial).cloned().collect();
        assert_eq!(
            importers,
            vec![
                layout.root().join("services/how-to/page.mdx"),
                layout.root().join("services/reference/a/page.mdx"),
            ]
        );
        assert!(!map.is_orphan(&partial));
    }

    #[test]
    fn missing_targets_and_code_blocks_create_no_edges() {
        let dir = tempdir().unwrap();
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let docs = vec![
            doc(&layout, "_partials/real.mdx", DocumentKind::Partial, "r"),
            doc(
                &layout,
                "page.mdx",
                DocumentKind::Regular,
                "import Gone from './_partials/gone.mdx';\n\n```js\nimport Real from './_partials/real.mdx';\n```\n",
            ),
        ];

        let map = TransclusionMap::build(&layout, &docs);
        assert!(map.is_empty());
        assert!(map.is_orphan(&layout.root().join("_partials/real.mdx")));
    }

    #[test]
    fn partial_context_includes_importer_directories() {
        let dir = tempdir().unwrap();
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let docs = vec![
            doc(&layout, "_partials/note.mdx", DocumentKind::Partial, "n"),
            doc(&layout, "a/page.mdx", DocumentKind::Regular, "import N from '../_partials/note';"),
            doc(&layout, "b/page.mdx", DocumentKind::Regular, "import N from '../_partials/note.mdx';"),
        ];
        let map = TransclusionMap::build(&layout, &docs);

        let dirs = map.context_dirs(&docs[0]);
        assert_eq!(
            dirs,
            BTreeSet::from([
                layout.root().join("_partials"),
                layout.root().join("a"),
                layout.root().join("b"),
            ])
        );
        assert_eq!(map.context_dirs(&docs[1]), BTreeSet::from([layout.root().join("a")]));
    }
}
