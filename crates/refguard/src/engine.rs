use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::components::disable_components;
use crate::config::RefguardConfig;
use crate::document::{Document, SkippedFile, load_documents};
use crate::error::RefguardError;
use crate::images::canonicalize_images;
use crate::links::{LinkResolver, RepairTable, ReplacementRules};
use crate::mdx_compat::apply_mdx_fixes;
use crate::partials::normalize_partial_imports;
use crate::report::RunReport;
use crate::scanner::{CorpusScan, scan_corpus};
use crate::transclusion::TransclusionMap;
use crate::workspace::CorpusLayout;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute every decision without writing documents back.
    pub dry_run: bool,
}

/// One partial and the documents that import it, corpus-relative.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartialUsage {
    pub partial: String,
    pub importers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransclusionReport {
    pub partials: Vec<PartialUsage>,
    pub orphans: Vec<String>,
}

/// Runs the scan, map, resolve pipeline over one corpus.
#[derive(Debug)]
pub struct Engine {
    layout: CorpusLayout,
    config: RefguardConfig,
    rules: ReplacementRules,
    repairs: RepairTable,
}

impl Engine {
    /// Compiles the configured rules. Fails only on an invalid pattern.
    pub fn new(layout: CorpusLayout, config: RefguardConfig) -> Result<Self, RefguardError> {
        let rules = ReplacementRules::from_config(&config)?;
        let repairs = RepairTable::with_rules(&config.repairs)?;
        Ok(Self {
            layout,
            config,
            rules,
            repairs,
        })
    }

    /// Opens `root` with the corpus settings carried by `config`.
    pub fn open(root: impl AsRef<Path>, config: RefguardConfig) -> Result<Self, RefguardError> {
        let layout = CorpusLayout::open(root, config.corpus.clone())?;
        Self::new(layout, config)
    }

    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    pub fn run(&self, options: RunOptions) -> Result<RunReport, RefguardError> {
        let (scan, mut documents, skipped) = self.load()?;
        let map = TransclusionMap::build(&self.layout, &documents);

        let mut report = RunReport {
            documents: documents.len(),
            partials: scan.partial_count(),
            orphan_partials: documents
                .iter()
                .filter(|doc| doc.is_partial() && map.is_orphan(&doc.path))
                .count(),
            dry_run: options.dry_run,
            skipped,
            missing_dirs: scan
                .missing_dirs
                .iter()
                .map(|dir| self.layout.display_path(dir))
                .collect(),
            ..RunReport::default()
        };

        let resolver = LinkResolver::new(&self.layout, &self.rules, &self.repairs);
        for doc in &mut documents {
            let contexts = map.context_dirs(doc);
            let file = self.layout.display_path(&doc.path);

            let (fixed, mdx_fixes) = apply_mdx_fixes(&doc.content);
            doc.content = fixed;
            report.mdx_fixes += mdx_fixes;

            report
                .records
                .extend(normalize_partial_imports(doc, &file, &self.layout));
            report
                .records
                .extend(canonicalize_images(doc, &file, &self.config.images));
            report
                .records
                .extend(disable_components(doc, &file, &self.config.components));

            let links = resolver.resolve(doc, &contexts);
            report.links.merge(links.stats);
            report.records.extend(links.records);

            if !doc.is_modified() {
                continue;
            }
            report.changed_files.push(file.clone());
            if options.dry_run {
                continue;
            }
            if let Err(err) = fs::write(&doc.path, &doc.content) {
                tracing::warn!(path = %doc.path.display(), error = %err, "failed to write document");
                report.skipped.push(SkippedFile {
                    path: file,
                    reason: format!("write failed: {err}"),
                });
            }
        }

        tracing::info!(
            documents = report.documents,
            changed = report.changed_files.len(),
            records = report.records.len(),
            dry_run = options.dry_run,
            "resolved corpus"
        );
        Ok(report)
    }

    /// Builds the transclusion relation without resolving anything.
    pub fn transclusion(&self) -> Result<TransclusionReport, RefguardError> {
        let (_, documents, _) = self.load()?;
        let map = TransclusionMap::build(&self.layout, &documents);

        let partials = map
            .iter()
            .map(|(partial, importers)| PartialUsage {
                partial: self.layout.display_path(partial),
                importers: importers
                    .iter()
                    .map(|path| self.layout.display_path(path))
                    .collect(),
            })
            .collect();
        let orphans = documents
            .iter()
            .filter(|doc| doc.is_partial() && map.is_orphan(&doc.path))
            .map(|doc| self.layout.display_path(&doc.path))
            .collect();

        Ok(TransclusionReport { partials, orphans })
    }

    fn load(&self) -> Result<(CorpusScan, Vec<Document>, Vec<SkippedFile>), RefguardError> {
        if !self.layout.root().is_dir() {
            return Err(RefguardError::CorpusRootMissing(
                self.layout.root().to_path_buf(),
            ));
        }
        let scan = scan_corpus(&self.layout);
        let (documents, skipped) = load_documents(&self.layout, &scan.entries);
        Ok((scan, documents, skipped))
    }
}
