//! Link classification, configured rewriting, validity, repair, and stripping.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use url::Url;

use crate::config::{PatternRule, RefguardConfig, RepairRule};
use crate::document::Document;
use crate::error::RefguardError;
use crate::markup::{Edit, LinkSpan, MarkupTree, apply_edits};
use crate::report::{LinkStats, RecordDetail, RewriteReason, RewriteRecord};
use crate::workspace::{CorpusLayout, normalize_path_lexical};

/// Migration rows that are always available, tried after configured repairs.
const BUILTIN_REPAIRS: [(&str, &str); 2] = [
    (r"^\.\./\.\./ethereum/concepts/(.+)$", "/services/concepts/${1}"),
    (r"^\.\./ethereum/concepts/(.+)$", "/services/concepts/${1}"),
];

const LITERAL_METACHARS: &str = "?^${}()|[]\\";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    /// Scheme-prefixed or protocol-relative.
    External,
    /// Fragment-only (or empty) destination.
    Anchor,
    /// Everything else; evaluated against the corpus.
    Candidate,
}

pub fn classify(target: &str) -> LinkClass {
    if target.is_empty() || target.starts_with('#') {
        return LinkClass::Anchor;
    }
    if target.starts_with("//") || Url::parse(target).is_ok() {
        return LinkClass::External;
    }
    LinkClass::Candidate
}

/// Splits `path#fragment` into the path and the fragment including its `#`.
pub fn split_fragment(target: &str) -> (&str, &str) {
    match target.find('#') {
        Some(idx) => target.split_at(idx),
        None => (target, ""),
    }
}

/// Converts a configured link pattern into an anchored regular expression.
///
/// Plain prefixes are escaped and match anything that starts with them. Patterns that
/// use `*`, a trailing `.+`, or regex metacharacters keep `.` and `+` live, escape the
/// rest, and turn `*` into `.*`.
pub fn pattern_to_regex(pattern: &str) -> String {
    let has_meta = pattern.contains('*')
        || pattern.ends_with(".+")
        || pattern.chars().any(|c| LITERAL_METACHARS.contains(c));

    if !has_meta {
        return format!("^{}.*", regex::escape(pattern));
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            c if LITERAL_METACHARS.contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    regex: Regex,
    base: String,
    replacement: String,
    extract_path: bool,
}

impl CompiledPattern {
    fn compile(rule: &PatternRule) -> Result<Self, RefguardError> {
        let regex = Regex::new(&pattern_to_regex(&rule.pattern))
            .map_err(|err| RefguardError::from(err).context(&rule.pattern))?;
        Ok(Self {
            regex,
            base: rule
                .pattern
                .strip_suffix(".+")
                .unwrap_or(&rule.pattern)
                .to_string(),
            replacement: rule.replacement.clone(),
            extract_path: rule.extract_path,
        })
    }

    fn rewrite(&self, target: &str) -> String {
        if !self.extract_path {
            return self.replacement.clone();
        }
        let suffix = target.get(self.base.len()..).unwrap_or("");
        format!("{}{suffix}", self.replacement)
    }
}

/// Configured rewrites applied to a link target before it is validated.
#[derive(Debug, Clone, Default)]
pub struct ReplacementRules {
    patterns: Vec<CompiledPattern>,
    exact: BTreeMap<String, String>,
}

impl ReplacementRules {
    pub fn from_config(config: &RefguardConfig) -> Result<Self, RefguardError> {
        let patterns = config
            .patterns
            .iter()
            .filter(|rule| !rule.pattern.is_empty())
            .map(CompiledPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            exact: config.replacements.clone(),
        })
    }

    /// Returns the rewritten target, or `None` when no rule changes it. The first
    /// matching pattern wins; the exact table is consulted only when no pattern
    /// produced a different target.
    pub fn apply(&self, target: &str) -> Option<String> {
        if let Some(pattern) = self.patterns.iter().find(|p| p.regex.is_match(target)) {
            let rewritten = pattern.rewrite(target);
            if rewritten != target {
                return Some(rewritten);
            }
        }

        let lookup = |key: &str| self.exact.get(key).cloned();
        let found = lookup(target)
            .or_else(|| {
                if target.starts_with('/') {
                    None
                } else {
                    lookup(&format!("/{target}"))
                }
            })
            .or_else(|| target.strip_prefix('/').and_then(lookup));
        found.filter(|rewritten| rewritten != target)
    }
}

#[derive(Debug, Clone)]
struct RepairPattern {
    regex: Regex,
    replacement: String,
}

/// Ordered `regex -> replacement` rows for known path migrations.
#[derive(Debug, Clone)]
pub struct RepairTable {
    rows: Vec<RepairPattern>,
}

impl Default for RepairTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RepairTable {
    pub fn builtin() -> Self {
        let rows = BUILTIN_REPAIRS
            .iter()
            .map(|(pattern, replacement)| RepairPattern {
                regex: Regex::new(pattern).expect("valid built-in repair pattern"),
                replacement: (*replacement).to_string(),
            })
            .collect();
        Self { rows }
    }

    /// Configured rules first, then the built-in rows.
    pub fn with_rules(rules: &[RepairRule]) -> Result<Self, RefguardError> {
        let mut rows = rules
            .iter()
            .map(|rule| {
                Ok(RepairPattern {
                    regex: Regex::new(&rule.pattern)
                        .map_err(|err| RefguardError::from(err).context(&rule.pattern))?,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>, RefguardError>>()?;
        rows.extend(Self::builtin().rows);
        Ok(Self { rows })
    }

    /// First replacement whose result satisfies `validates`. The fragment of `target`
    /// is carried over to the repaired link.
    pub fn repair(&self, target: &str, validates: impl Fn(&str) -> bool) -> Option<String> {
        let (path, fragment) = split_fragment(target);
        self.rows
            .iter()
            .filter(|row| row.regex.is_match(path))
            .map(|row| {
                let repaired = row.regex.replace(path, row.replacement.as_str());
                format!("{repaired}{fragment}")
            })
            .find(|candidate| candidate != target && validates(candidate))
    }
}

/// Output of the link pass over one document.
#[derive(Debug, Clone, Default)]
pub struct LinkPass {
    pub records: Vec<RewriteRecord>,
    pub stats: LinkStats,
}

/// Decides the fate of every inline link in a document.
#[derive(Debug)]
pub struct LinkResolver<'a> {
    layout: &'a CorpusLayout,
    rules: &'a ReplacementRules,
    repairs: &'a RepairTable,
}

impl<'a> LinkResolver<'a> {
    pub fn new(
        layout: &'a CorpusLayout,
        rules: &'a ReplacementRules,
        repairs: &'a RepairTable,
    ) -> Self {
        Self {
            layout,
            rules,
            repairs,
        }
    }

    /// Runs the link procedure over `doc`, rewriting its content in place. `contexts`
    /// is the document's context-directory set.
    pub fn resolve(&self, doc: &mut Document, contexts: &BTreeSet<PathBuf>) -> LinkPass {
        let tree = MarkupTree::parse(&doc.content);
        let file = self.layout.display_path(&doc.path);
        let mut pass = LinkPass::default();
        let mut edits = Vec::new();

        for link in &tree.links {
            if tree.is_inert(&link.range) {
                continue;
            }
            let original = link.url.as_str();
            if classify(original) != LinkClass::Candidate {
                pass.stats.skipped += 1;
                continue;
            }
            let text = doc.content.get(link.text.clone()).unwrap_or("").to_string();

            let mut target = original.to_string();
            if let Some(rewritten) = self.rules.apply(original) {
                tracing::debug!(file = %file, from = original, to = %rewritten, "configured link rewrite");
                target = rewritten;
            }
            let replaced = target != original;

            if !replaced && self.is_valid(&target, contexts) {
                pass.stats.valid += 1;
                continue;
            }

            if replaced && (classify(&target) != LinkClass::Candidate || self.is_valid(&target, contexts)) {
                edits.push(rewrite_link(&doc.content, link, &text, &target));
                pass.records.push(rewrite_record(&file, original, &target, &text, RewriteReason::Replacement));
                pass.stats.rewritten += 1;
                continue;
            }

            if let Some(repaired) = self.repairs.repair(&target, |c| self.is_valid(c, contexts)) {
                tracing::debug!(file = %file, from = original, to = %repaired, "repaired link");
                edits.push(rewrite_link(&doc.content, link, &text, &repaired));
                pass.records.push(rewrite_record(&file, original, &repaired, &text, RewriteReason::Repair));
                pass.stats.rewritten += 1;
                continue;
            }

            tracing::debug!(file = %file, link = original, "stripping broken link");
            edits.push(Edit::new(link.range.clone(), text.clone()));
            pass.records.push(RewriteRecord {
                file: file.clone(),
                original: original.to_string(),
                replacement: None,
                text,
                detail: RecordDetail::BrokenLink,
            });
            pass.stats.stripped += 1;
        }

        if !edits.is_empty() {
            doc.content = apply_edits(&doc.content, edits);
        }
        pass
    }

    /// Union semantics: valid when the target exists from any context directory.
    pub fn is_valid(&self, target: &str, contexts: &BTreeSet<PathBuf>) -> bool {
        let (path, _) = split_fragment(target);
        if path.is_empty() {
            return true;
        }
        if path.starts_with('/') {
            return self.exists(&self.layout.resolve_root_absolute(path));
        }
        contexts.iter().any(|dir| self.exists_from(dir, path))
    }

    fn exists_from(&self, dir: &Path, path: &str) -> bool {
        if self.exists(&normalize_path_lexical(&dir.join(path))) {
            return true;
        }
        if !path.starts_with("../") {
            return false;
        }
        match path.trim_end_matches('/').rsplit('/').next() {
            Some(name) if !name.is_empty() && name != ".." => self.exists(&dir.join(name)),
            _ => false,
        }
    }

    /// Paths that normalize outside the corpus root never exist.
    fn exists(&self, path: &Path) -> bool {
        if !path.starts_with(self.layout.root()) {
            return false;
        }
        if path.exists() {
            return true;
        }
        path.extension().is_none()
            && self
                .layout
                .settings()
                .extensions
                .iter()
                .any(|ext| PathBuf::from(format!("{}.{ext}", path.display())).exists())
    }
}

/// Replaces the destination of `link` with `target`, keeping any title.
fn rewrite_link(content: &str, link: &LinkSpan, text: &str, target: &str) -> Edit {
    let destination = content.get(link.destination.clone()).unwrap_or("");
    let replacement = match destination.find(link.url.as_str()) {
        Some(idx) if !link.url.is_empty() => {
            let mut rewritten = destination.to_string();
            rewritten.replace_range(idx..idx + link.url.len(), target);
            format!("[{text}]({rewritten})")
        }
        _ => format!("[{text}]({target})"),
    };
    Edit::new(link.range.clone(), replacement)
}

fn rewrite_record(
    file: &str,
    original: &str,
    target: &str,
    text: &str,
    reason: RewriteReason,
) -> RewriteRecord {
    RewriteRecord {
        file: file.to_string(),
        original: original.to_string(),
        replacement: Some(target.to_string()),
        text: text.to_string(),
        detail: RecordDetail::LinkRewrite { reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DocumentKind;
    use crate::workspace::CorpusSettings;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# doc\n").unwrap();
    }

    fn run(layout: &CorpusLayout, rel: &str, content: &str, config: &RefguardConfig) -> (String, LinkPass) {
        let rules = ReplacementRules::from_config(config).unwrap();
        let repairs = RepairTable::with_rules(&config.repairs).unwrap();
        let resolver = LinkResolver::new(layout, &rules, &repairs);
        let mut doc = Document::new(layout.root().join(rel), DocumentKind::Regular, content.into());
        let contexts = BTreeSet::from([doc.dir().to_path_buf()]);
        let pass = resolver.resolve(&mut doc, &contexts);
        (doc.content, pass)
    }

    #[test]
    fn classification_leaves_external_and_anchor_links_alone() {
        assert_eq!(classify("https://example.com/x"), LinkClass::External);
        assert_eq!(classify("mailto:team@example.com"), LinkClass::External);
        assert_eq!(classify("//cdn.example.com/a.js"), LinkClass::External);
        assert_eq!(classify("#section"), LinkClass::Anchor);
        assert_eq!(classify("../a/b.md"), LinkClass::Candidate);
        assert_eq!(classify("/services/x"), LinkClass::Candidate);
    }

    #[test]
    fn glob_patterns_follow_prefix_and_wildcard_rules() {
        assert_eq!(pattern_to_regex("/api/.+"), r"^/api/.+");
        assert_eq!(pattern_to_regex("/a/*/b"), "^/a/.*/b");
        let literal = Regex::new(&pattern_to_regex("/developer-tools/dashboard")).unwrap();
        assert!(literal.is_match("/developer-tools/dashboard/keys"));
        assert!(!literal.is_match("/x/developer-tools/dashboard"));
    }

    #[test]
    fn replacement_rules_prefer_patterns_then_exact_table() {
        let config = parse(
            r#"
replacements:
  /old/page: /new/page
patterns:
  - pattern: /api/.+
    replacement: /reference/
    extractPath: true
  - pattern: /developer-tools/dashboard
    replacement: dashboard/dashboard-placeholder.md
"#,
        );
        let rules = ReplacementRules::from_config(&config).unwrap();
        assert_eq!(rules.apply("/api/eth_call").as_deref(), Some("/reference/eth_call"));
        assert_eq!(
            rules.apply("/developer-tools/dashboard/x").as_deref(),
            Some("dashboard/dashboard-placeholder.md")
        );
        assert_eq!(rules.apply("old/page").as_deref(), Some("/new/page"));
        assert_eq!(rules.apply("/unrelated"), None);
    }

    fn parse(yaml: &str) -> RefguardConfig {
        crate::config::parse_config(yaml).unwrap()
    }

    #[test]
    fn broken_links_are_stripped_to_their_text() {
        let dir = tempdir().unwrap();
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let (content, pass) = run(
            &layout,
            "x/page.md",
            "See [Link](../missing/file.md) here.\n",
            &RefguardConfig::default(),
        );
        assert_eq!(content, "See Link here.\n");
        assert_eq!(pass.stats.stripped, 1);
        let record = &pass.records[0];
        assert_eq!(record.file, "x/page.md");
        assert_eq!(record.original, "../missing/file.md");
        assert_eq!(record.text, "Link");
        assert_eq!(record.detail, RecordDetail::BrokenLink);
    }

    #[test]
    fn valid_links_are_byte_identical_including_extensionless_targets() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a/target.md");
        touch(dir.path(), "a/sibling.mdx");
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let input = "[One](target.md#top) [Two](./sibling) [Three](https://x.io) [Four](#here)\n";
        let (content, pass) = run(&layout, "a/page.md", input, &RefguardConfig::default());
        assert_eq!(content, input);
        assert_eq!(pass.stats.valid, 2);
        assert_eq!(pass.stats.skipped, 2);
        assert!(pass.records.is_empty());
    }

    #[test]
    fn extra_parent_segments_fall_back_to_sibling_basename() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a/b/sibling.md");
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let input = "[S](../../sibling.md)\n";
        let (content, pass) = run(&layout, "a/b/page.md", input, &RefguardConfig::default());
        assert_eq!(content, input);
        assert_eq!(pass.stats.valid, 1);
    }

    #[test]
    fn targets_outside_the_corpus_root_are_stripped() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "outside.md");
        touch(dir.path(), "docs/index.md");
        let layout = CorpusLayout::open(dir.path().join("docs"), CorpusSettings::default()).unwrap();
        let (content, pass) = run(
            &layout,
            "page.md",
            "[o](/../outside.md) and [p](../outside.md)\n",
            &RefguardConfig::default(),
        );
        assert_eq!(content, "o and p\n");
        assert_eq!(pass.stats.valid, 0);
        assert_eq!(pass.stats.stripped, 2);
    }

    #[test]
    fn migration_table_repairs_moved_concepts() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "services/concepts/gas.md");
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let (content, pass) = run(
            &layout,
            "services/how-to/page.md",
            "Read [gas](../../ethereum/concepts/gas.md#fees \"Gas\").\n",
            &RefguardConfig::default(),
        );
        assert_eq!(content, "Read [gas](/services/concepts/gas.md#fees \"Gas\").\n");
        assert_eq!(
            pass.records[0].detail,
            RecordDetail::LinkRewrite {
                reason: RewriteReason::Repair
            }
        );

        let (again, pass) = run(&layout, "services/how-to/page.md", &content, &RefguardConfig::default());
        assert_eq!(again, content);
        assert!(pass.records.is_empty());
    }

    #[test]
    fn configured_repairs_run_before_builtin_rows() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "archive/concepts/gas.md");
        touch(dir.path(), "services/concepts/gas.md");
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let config = parse("repairs:\n  - pattern: '^\\.\\./ethereum/(.+)$'\n    replacement: '/archive/$1'\n");
        let (content, _) = run(&layout, "x/page.md", "[g](../ethereum/concepts/gas.md)", &config);
        assert_eq!(content, "[g](/archive/concepts/gas.md)");
    }

    #[test]
    fn replaced_targets_are_validated_and_logged() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "reference/eth_call.md");
        let layout = CorpusLayout::open(dir.path(), CorpusSettings::default()).unwrap();
        let config = parse(
            "patterns:\n  - pattern: /api/.+\n    replacement: /reference/\n    extractPath: true\nreplacements:\n  /gone: https://example.com/gone\n",
        );
        let (content, pass) = run(
            &layout,
            "x/page.md",
            "[call](/api/eth_call) [gone](/gone) [dead](/api/nothing)\n",
            &config,
        );
        assert_eq!(content, "[call](/reference/eth_call) [gone](https://example.com/gone) dead\n");
        assert_eq!(pass.stats.rewritten, 2);
        assert_eq!(pass.stats.stripped, 1);
        assert_eq!(pass.records[2].original, "/api/nothing");
    }
}
