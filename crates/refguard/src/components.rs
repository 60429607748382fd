//! Disables imports of site-local components and constants that the target site does
//! not provide, together with every usage of the imported identifiers. Original text is
//! kept inside comments so maintainers can restore it.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ComponentSettings;
use crate::document::Document;
use crate::markup::{Edit, Flavor, MarkupTree, apply_edits};
use crate::report::{ComponentKind, RecordDetail, RewriteRecord};

const COMPONENT_NOTE: &str = "Component not available";
const CONSTANT_NOTE: &str = "Constant not available";

fn import_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*(import\s+(.+?)\s+from\s+["']([^"']+)["'][ \t]*;?)[ \t]*$"#)
            .expect("valid import line regex")
    })
}

fn block_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/\*[\s\S]*?\*/").expect("valid block comment regex"))
}

/// A disabled import and the identifiers it bound.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DisabledImport {
    statement: String,
    module: String,
    kind: ComponentKind,
    identifiers: Vec<String>,
}

/// Runs the component pass over `doc`. Returns one record per disabled import.
pub fn disable_components(
    doc: &mut Document,
    file: &str,
    settings: &ComponentSettings,
) -> Vec<RewriteRecord> {
    let (content, disabled) = disable_imports(&doc.content, settings);
    if disabled.is_empty() {
        return Vec::new();
    }

    let mut content = content;
    for import in &disabled {
        for ident in &import.identifiers {
            content = disable_tags(&content, ident);
            content = disable_member_access(&content, ident);
        }
    }
    doc.content = content;

    tracing::debug!(file, imports = disabled.len(), "disabled unavailable components");
    disabled
        .into_iter()
        .map(|import| RewriteRecord {
            file: file.to_string(),
            replacement: Some(jsx_comment(&import.statement, note_for(import.kind))),
            text: import.identifiers.join(", "),
            original: import.statement,
            detail: RecordDetail::Component {
                kind: import.kind,
                module: import.module,
            },
        })
        .collect()
}

/// Comments out every import from a configured module, isolating each comment in its
/// own paragraph so it parses as a standalone expression.
fn disable_imports(content: &str, settings: &ComponentSettings) -> (String, Vec<DisabledImport>) {
    let tree = MarkupTree::parse(content);
    let mut edits = Vec::new();
    let mut disabled = Vec::new();

    for caps in import_line_regex().captures_iter(content) {
        let (Some(line), Some(statement), Some(clause), Some(module)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if tree.is_inert(&line.range()) {
            continue;
        }
        let module = module.as_str();
        if !settings.modules.iter().any(|prefix| module.starts_with(prefix.as_str())) {
            continue;
        }
        let kind = if settings
            .constant_modules
            .iter()
            .any(|prefix| module.starts_with(prefix.as_str()))
        {
            ComponentKind::Constant
        } else {
            ComponentKind::Component
        };

        let identifiers = import_identifiers(clause.as_str());
        if identifiers.is_empty() {
            continue;
        }

        let mut replacement = jsx_comment(statement.as_str(), note_for(kind));
        let range = line.range();
        if !preceded_by_blank_line(content, range.start) {
            replacement.insert(0, '\n');
        }
        if !followed_by_blank_line(content, range.end) {
            replacement.push('\n');
        }
        edits.push(Edit::new(range, replacement));
        disabled.push(DisabledImport {
            statement: statement.as_str().to_string(),
            module: module.to_string(),
            kind,
            identifiers,
        });
    }

    (apply_edits(content, edits), disabled)
}

/// Identifiers bound by an import clause: `X`, `{ a, b as c }`, or `X, { a }`.
fn import_identifiers(clause: &str) -> Vec<String> {
    let mut identifiers = Vec::new();
    let (default, named) = match clause.find('{') {
        Some(idx) => (&clause[..idx], Some(&clause[idx..])),
        None => (clause, None),
    };

    let default = default.trim().trim_end_matches(',').trim();
    if is_identifier(default) {
        identifiers.push(default.to_string());
    }
    if let Some(named) = named {
        let inner = named.trim_start_matches('{').trim_end().trim_end_matches('}');
        for entry in inner.split(',') {
            let name = entry.rsplit(" as ").next().unwrap_or(entry).trim();
            if is_identifier(name) {
                identifiers.push(name.to_string());
            }
        }
    }
    identifiers
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Comments out every `<ident …>` usage. MDX element spans are used when the document
/// parses as MDX; otherwise tags are matched textually, self-closing before paired, and a
/// paired tag closes at the nearest `</ident>`. Nested same-named tags therefore leave
/// the outer closing tag behind in that mode.
fn disable_tags(content: &str, ident: &str) -> String {
    let tree = MarkupTree::parse(content);
    if tree.flavor == Flavor::Mdx {
        let ranges = outermost(
            tree.elements
                .iter()
                .filter(|el| el.name == ident)
                .map(|el| el.range.clone())
                .collect(),
        );
        return comment_ranges(content, &tree, ranges, COMPONENT_NOTE);
    }

    let escaped = regex::escape(ident);
    let pattern = format!(r"<{escaped}\b[^>]*?/>|<{escaped}\b[^>]*>[\s\S]*?</{escaped}\s*>");
    let Ok(regex) = Regex::new(&pattern) else {
        return content.to_string();
    };

    let protected = protected_ranges(content, &tree);
    let mut ranges = Vec::new();
    let mut at = 0;
    while let Some(m) = regex.find_at(content, at) {
        match protected.iter().find(|r| r.contains(&m.start())) {
            Some(skip) => at = skip.end,
            None => {
                ranges.push(m.range());
                at = m.end();
            }
        }
    }
    comment_ranges(content, &tree, ranges, COMPONENT_NOTE)
}

/// Code, front matter, and comments a textual tag match must not start inside.
fn protected_ranges(content: &str, tree: &MarkupTree) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = tree.inert_ranges().to_vec();
    ranges.extend(block_comment_regex().find_iter(content).map(|m| m.range()));
    ranges
}

/// Comments out `ident.member(.member)*` outside code and existing comments.
fn disable_member_access(content: &str, ident: &str) -> String {
    let pattern = format!(r"\b{}(?:\.[A-Za-z_$][\w$]*)+", regex::escape(ident));
    let Ok(regex) = Regex::new(&pattern) else {
        return content.to_string();
    };
    let tree = MarkupTree::parse(content);
    let ranges = regex
        .find_iter(content)
        .filter(|m| {
            let before = content[..m.start()].chars().next_back();
            !matches!(before, Some('.') | Some('$'))
        })
        .map(|m| m.range())
        .collect();
    comment_ranges(content, &tree, ranges, CONSTANT_NOTE)
}

fn comment_ranges(
    content: &str,
    tree: &MarkupTree,
    ranges: Vec<Range<usize>>,
    note: &str,
) -> String {
    let protected = protected_ranges(content, tree);
    let edits = ranges
        .into_iter()
        .filter(|range| !protected.iter().any(|p| p.start < range.end && range.start < p.end))
        .filter_map(|range| {
            let text = content.get(range.clone())?;
            let commented = if note == COMPONENT_NOTE {
                jsx_comment(text, note)
            } else {
                comment_out(text, note)
            };
            Some(Edit::new(range, commented))
        })
        .collect();
    apply_edits(content, edits)
}

/// Drops ranges nested inside an earlier, wider range.
fn outermost(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|r| (r.start, std::cmp::Reverse(r.end)));
    let mut kept: Vec<Range<usize>> = Vec::new();
    for range in ranges {
        if kept.last().is_some_and(|last| range.start < last.end) {
            continue;
        }
        kept.push(range);
    }
    kept
}

/// `/* text - note */`, with any `*/` inside `text` escaped so the comment stays closed.
fn comment_out(text: &str, note: &str) -> String {
    format!("/* {} - {note} */", text.replace("*/", "*\\/"))
}

fn jsx_comment(text: &str, note: &str) -> String {
    format!("{{{}}}", comment_out(text, note))
}

fn note_for(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Component => COMPONENT_NOTE,
        ComponentKind::Constant => CONSTANT_NOTE,
    }
}

fn preceded_by_blank_line(content: &str, line_start: usize) -> bool {
    let before = &content[..line_start];
    before.is_empty() || before.ends_with("\n\n") || before.trim().is_empty()
}

fn followed_by_blank_line(content: &str, line_end: usize) -> bool {
    let after = &content[line_end..];
    after.is_empty() || after == "\n" || after.starts_with("\n\n") || after.starts_with("\n\r\n")
}
