use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::document::SkippedFile;
use crate::error::RefguardError;

/// Number of broken links echoed in the console summary.
pub const BROKEN_LINK_EXAMPLES: usize = 10;

pub const IMAGE_LOG: &str = "image-path-fixes.log";
pub const COMPONENT_LOG: &str = "component-import-fixes.log";
pub const BROKEN_LINK_LOG: &str = "broken-links-removed.log";
pub const LINK_REWRITE_LOG: &str = "link-rewrites.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteCategory {
    Image,
    Component,
    BrokenLink,
    LinkRewrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Component,
    Constant,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Component => "component",
            ComponentKind::Constant => "constant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteReason {
    Replacement,
    Repair,
    PartialImport,
}

impl RewriteReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteReason::Replacement => "replacement",
            RewriteReason::Repair => "repair",
            RewriteReason::PartialImport => "partial-import",
        }
    }
}

/// Category-specific fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum RecordDetail {
    Image { image: String },
    Component { kind: ComponentKind, module: String },
    BrokenLink,
    LinkRewrite { reason: RewriteReason },
}

/// One audited decision. Write-only: the engine never reads these back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteRecord {
    /// Corpus-relative path of the document.
    pub file: String,
    /// Text that was replaced.
    pub original: String,
    /// Replacement text; `None` when the markup was removed.
    pub replacement: Option<String>,
    /// Visible link text, image path, or identifier.
    pub text: String,
    #[serde(flatten)]
    pub detail: RecordDetail,
}

impl RewriteRecord {
    pub fn category(&self) -> RewriteCategory {
        match self.detail {
            RecordDetail::Image { .. } => RewriteCategory::Image,
            RecordDetail::Component { .. } => RewriteCategory::Component,
            RecordDetail::BrokenLink => RewriteCategory::BrokenLink,
            RecordDetail::LinkRewrite { .. } => RewriteCategory::LinkRewrite,
        }
    }
}

/// Per-link outcome counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// External and anchor-only links, never evaluated.
    pub skipped: usize,
    pub valid: usize,
    pub rewritten: usize,
    pub stripped: usize,
}

impl LinkStats {
    pub fn merge(&mut self, other: LinkStats) {
        self.skipped += other.skipped;
        self.valid += other.valid;
        self.rewritten += other.rewritten;
        self.stripped += other.stripped;
    }
}

/// Everything a full corpus pass produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub documents: usize,
    pub partials: usize,
    pub orphan_partials: usize,
    pub changed_files: Vec<String>,
    pub dry_run: bool,
    pub links: LinkStats,
    pub mdx_fixes: usize,
    pub records: Vec<RewriteRecord>,
    pub skipped: Vec<SkippedFile>,
    pub missing_dirs: Vec<String>,
}

impl RunReport {
    pub fn records_in(&self, category: RewriteCategory) -> impl Iterator<Item = &RewriteRecord> {
        self.records
            .iter()
            .filter(move |record| record.category() == category)
    }

    pub fn count(&self, category: RewriteCategory) -> usize {
        self.records_in(category).count()
    }

    pub fn summary(&self) -> Summary {
        let broken: Vec<&RewriteRecord> = self.records_in(RewriteCategory::BrokenLink).collect();
        Summary {
            documents: self.documents,
            partials: self.partials,
            orphan_partials: self.orphan_partials,
            changed_files: self.changed_files.len(),
            dry_run: self.dry_run,
            images: self.count(RewriteCategory::Image),
            components: self.count(RewriteCategory::Component),
            link_rewrites: self.count(RewriteCategory::LinkRewrite),
            broken_links: broken.len(),
            mdx_fixes: self.mdx_fixes,
            skipped_files: self.skipped.len(),
            broken_examples: broken
                .iter()
                .take(BROKEN_LINK_EXAMPLES)
                .map(|r| BrokenLinkExample {
                    file: r.file.clone(),
                    link: r.original.clone(),
                    text: r.text.clone(),
                })
                .collect(),
        }
    }
}

/// Console-facing counts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub documents: usize,
    pub partials: usize,
    pub orphan_partials: usize,
    pub changed_files: usize,
    pub dry_run: bool,
    pub images: usize,
    pub components: usize,
    pub link_rewrites: usize,
    pub broken_links: usize,
    pub mdx_fixes: usize,
    pub skipped_files: usize,
    pub broken_examples: Vec<BrokenLinkExample>,
}

impl Summary {
    pub fn has_transformations(&self) -> bool {
        self.images + self.components + self.link_rewrites + self.broken_links + self.mdx_fixes
            > 0
    }

    pub fn remaining_broken(&self) -> usize {
        self.broken_links.saturating_sub(self.broken_examples.len())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BrokenLinkExample {
    pub file: String,
    pub link: String,
    pub text: String,
}

/// Regenerates every audit log under `dir`. Logs are overwritten, including when a
/// category is empty, so they always describe the latest pass.
pub fn write_reports(report: &RunReport, dir: &Path) -> Result<Vec<PathBuf>, RefguardError> {
    fs::create_dir_all(dir)?;

    let logs = [
        (IMAGE_LOG, "Image Path Fixes", RewriteCategory::Image),
        (COMPONENT_LOG, "Component Import Fixes", RewriteCategory::Component),
        (BROKEN_LINK_LOG, "Broken Links Removed", RewriteCategory::BrokenLink),
        (LINK_REWRITE_LOG, "Link Rewrites", RewriteCategory::LinkRewrite),
    ];

    let mut written = Vec::with_capacity(logs.len());
    for (name, title, category) in logs {
        let records: Vec<&RewriteRecord> = report.records_in(category).collect();
        let path = dir.join(name);
        fs::write(&path, render_log(title, &records))?;
        tracing::debug!(path = %path.display(), entries = records.len(), "wrote audit log");
        written.push(path);
    }
    Ok(written)
}

fn render_log(title: &str, records: &[&RewriteRecord]) -> String {
    let mut out = format!("{title} ({} total)\n{}\n\n", records.len(), "=".repeat(80));
    let entries: Vec<String> = records.iter().map(|r| render_entry(r)).collect();
    out.push_str(&entries.join("\n"));
    out
}

fn render_entry(record: &RewriteRecord) -> String {
    let mut entry = format!("File: {}\n", record.file);
    let replacement = record.replacement.as_deref().unwrap_or("(removed)");
    // Writing into a String cannot fail.
    let _ = match &record.detail {
        RecordDetail::Image { image } => write!(
            entry,
            "  Original: {}\n  New: {replacement}\n  Image: {image}\n",
            record.original
        ),
        RecordDetail::Component { kind, module } => write!(
            entry,
            "  Type: {}\n  Name: {}\n  Path: {module}\n  Import: {}\n",
            kind.as_str(),
            record.text,
            record.original
        ),
        RecordDetail::BrokenLink => write!(
            entry,
            "  Link Text: {}\n  Broken Link: {}\n",
            record.text, record.original
        ),
        RecordDetail::LinkRewrite { reason } => write!(
            entry,
            "  Reason: {}\n  Original: {}\n  New: {replacement}\n  Text: {}\n",
            reason.as_str(),
            record.original,
            record.text
        ),
    };
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn broken(file: &str, link: &str, text: &str) -> RewriteRecord {
        RewriteRecord {
            file: file.into(),
            original: link.into(),
            replacement: None,
            text: text.into(),
            detail: RecordDetail::BrokenLink,
        }
    }

    #[test]
    fn summary_caps_broken_link_examples() {
        let report = RunReport {
            records: (0..12)
                .map(|i| broken("x/page.md", &format!("../missing/{i}.md"), "Link"))
                .collect(),
            ..RunReport::default()
        };
        let summary = report.summary();
        assert_eq!(summary.broken_links, 12);
        assert_eq!(summary.broken_examples.len(), BROKEN_LINK_EXAMPLES);
        assert_eq!(summary.remaining_broken(), 2);
        assert!(summary.has_transformations());
    }

    #[test]
    fn logs_are_overwritten_even_when_empty() {
        let dir = tempdir().unwrap();
        let report = RunReport {
            records: vec![broken("x/page.md", "../missing/file.md", "Link")],
            ..RunReport::default()
        };
        write_reports(&report, dir.path()).unwrap();
        let log = fs::read_to_string(dir.path().join(BROKEN_LINK_LOG)).unwrap();
        assert!(log.starts_with("Broken Links Removed (1 total)"));
        assert!(log.contains("File: x/page.md\n  Link Text: Link\n  Broken Link: ../missing/file.md\n"));

        write_reports(&RunReport::default(), dir.path()).unwrap();
        let log = fs::read_to_string(dir.path().join(BROKEN_LINK_LOG)).unwrap();
        assert!(log.starts_with("Broken Links Removed (0 total)"));
        assert!(!log.contains("x/page.md"));
        assert!(dir.path().join(IMAGE_LOG).is_file());
        assert!(dir.path().join(LINK_REWRITE_LOG).is_file());
    }

    #[test]
    fn records_serialize_with_category_tag() {
        let record = RewriteRecord {
            file: "a.mdx".into(),
            original: "require('../images/a.png')".into(),
            replacement: Some("require('@site/static/img/a.png')".into()),
            text: "a.png".into(),
            detail: RecordDetail::Image {
                image: "a.png".into(),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["category"], "image");
        assert_eq!(json["image"], "a.png");
        assert_eq!(record.category(), RewriteCategory::Image);
    }
}
