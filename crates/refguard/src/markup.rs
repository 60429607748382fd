//! Minimal typed view over a Markdown/MDX document.
//!
//! Documents are parsed with `markdown` (MDX constructs first, GFM as the fallback) and
//! flattened into the spans the resolver passes care about: inline links, JSX elements,
//! and inert ranges (code, front matter, comments) that no pass may rewrite. Everything
//! else is raw text addressed by byte offsets.

use std::ops::Range;
use std::sync::OnceLock;

use markdown::mdast::Node;
use markdown::ParseOptions;
use regex::Regex;

/// Which grammar produced the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Mdx,
    Markdown,
}

/// An inline `[text](destination)` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    /// Whole link, brackets and parentheses included.
    pub range: Range<usize>,
    /// Raw label source between `[` and `]`.
    pub text: Range<usize>,
    /// Raw source between `(` and the closing `)`.
    pub destination: Range<usize>,
    /// Destination as parsed.
    pub url: String,
}

/// A JSX element, from its opening `<` through its closing `>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    pub range: Range<usize>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct MarkupTree {
    pub flavor: Flavor,
    pub links: Vec<LinkSpan>,
    pub elements: Vec<ElementSpan>,
    inert: Vec<Range<usize>>,
}

impl MarkupTree {
    pub fn parse(content: &str) -> Self {
        let mut mdx = ParseOptions::mdx();
        mdx.constructs.frontmatter = true;

        let (root, flavor) = match markdown::to_mdast(content, &mdx) {
            Ok(root) => (Some(root), Flavor::Mdx),
            Err(message) => {
                tracing::debug!(%message, "mdx parse failed; falling back to gfm");
                let mut gfm = ParseOptions::gfm();
                gfm.constructs.frontmatter = true;
                (markdown::to_mdast(content, &gfm).ok(), Flavor::Markdown)
            }
        };

        let mut tree = MarkupTree {
            flavor,
            links: Vec::new(),
            elements: Vec::new(),
            inert: Vec::new(),
        };
        if let Some(root) = root {
            tree.walk(content, &root);
        }
        for m in jsx_comment_regex().find_iter(content) {
            tree.inert.push(m.range());
        }
        tree.inert.sort_by_key(|r| r.start);
        tree
    }

    /// Whether `range` touches code, front matter, or an existing comment.
    pub fn is_inert(&self, range: &Range<usize>) -> bool {
        self.inert
            .iter()
            .any(|r| r.start < range.end.max(range.start + 1) && range.start < r.end)
    }

    pub fn inert_ranges(&self) -> &[Range<usize>] {
        &self.inert
    }

    fn walk(&mut self, content: &str, node: &Node) {
        match node {
            Node::Code(_) | Node::InlineCode(_) | Node::Yaml(_) | Node::Toml(_) => {
                if let Some(range) = node_range(node) {
                    self.inert.push(range);
                }
            }
            Node::Html(html) => {
                if html.value.trim_start().starts_with("<!--") {
                    if let Some(range) = node_range(node) {
                        self.inert.push(range);
                    }
                }
            }
            Node::Link(link) => {
                if let Some(span) = link_span(content, link) {
                    self.links.push(span);
                }
            }
            Node::MdxJsxFlowElement(el) => {
                self.push_element(node, el.name.as_deref());
                self.walk_children(content, node);
            }
            Node::MdxJsxTextElement(el) => {
                self.push_element(node, el.name.as_deref());
                self.walk_children(content, node);
            }
            _ => self.walk_children(content, node),
        }
    }

    fn walk_children(&mut self, content: &str, node: &Node) {
        if let Some(children) = node.children() {
            for child in children {
                self.walk(content, child);
            }
        }
    }

    fn push_element(&mut self, node: &Node, name: Option<&str>) {
        if let (Some(name), Some(range)) = (name, node_range(node)) {
            self.elements.push(ElementSpan {
                range,
                name: name.to_string(),
            });
        }
    }
}

fn node_range(node: &Node) -> Option<Range<usize>> {
    node.position().map(|p| p.start.offset..p.end.offset)
}

fn link_span(content: &str, link: &markdown::mdast::Link) -> Option<LinkSpan> {
    let pos = link.position.as_ref()?;
    let (start, end) = (pos.start.offset, pos.end.offset);
    let raw = content.get(start..end)?;
    if !raw.starts_with('[') || !raw.ends_with(')') {
        return None;
    }

    let label_from = link
        .children
        .last()
        .and_then(|child| child.position())
        .map(|p| p.end.offset)
        .unwrap_or(start + 1)
        .clamp(start + 1, end);
    let label_end = label_from + content.get(label_from..end)?.find("](")?;

    Some(LinkSpan {
        range: start..end,
        text: start + 1..label_end,
        destination: label_end + 2..end - 1,
        url: link.url.clone(),
    })
}

fn jsx_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{/\*[\s\S]*?\*/\}").expect("valid jsx comment regex"))
}

/// A replacement of one byte range of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn new(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }
}

/// Applies non-overlapping edits in document order. An edit overlapping one that
/// starts earlier is dropped.
pub fn apply_edits(content: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > content.len() {
            continue;
        }
        let (Some(before), Some(_)) = (
            content.get(cursor..edit.range.start),
            content.get(edit.range.clone()),
        ) else {
            continue;
        };
        out.push_str(before);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&content[cursor..]);
    out
}
