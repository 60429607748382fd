use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::{DocumentEntry, DocumentKind};
use crate::workspace::CorpusLayout;

/// A content file loaded for one run. Passes mutate `content` in place; the text read
/// from disk is kept so the engine knows whether to write the file back.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub content: String,
    original: String,
}

impl Document {
    pub fn new(path: PathBuf, kind: DocumentKind, content: String) -> Self {
        Self {
            path,
            kind,
            original: content.clone(),
            content,
        }
    }

    /// Directory the document lives in; the base for its relative references.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn is_partial(&self) -> bool {
        self.kind == DocumentKind::Partial
    }

    pub fn is_modified(&self) -> bool {
        self.content != self.original
    }
}

/// A file that could not be read or written; the run continues without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Reads every scanned entry. Unreadable files are skipped with a warning.
pub fn load_documents(
    layout: &CorpusLayout,
    entries: &[DocumentEntry],
) -> (Vec<Document>, Vec<SkippedFile>) {
    let mut documents = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        match fs::read_to_string(&entry.path) {
            Ok(content) => documents.push(Document::new(entry.path.clone(), entry.kind, content)),
            Err(err) => {
                tracing::warn!(path = %entry.path.display(), error = %err, "skipping unreadable file");
                skipped.push(SkippedFile {
                    path: layout.display_path(&entry.path),
                    reason: format!("read failed: {err}"),
                });
            }
        }
    }

    (documents, skipped)
}
