//! Text fixes that keep prose from being read as JSX by MDX: entities that were
//! escaped inside tag syntax are restored, and bare `<=`/`>=` comparisons in prose are
//! wrapped in inline code.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::markup::MarkupTree;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>\n]*>").expect("valid tag regex"))
}

fn trailing_gt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&gt;([ \t]*\n[ \t]*<)").expect("valid trailing gt regex"))
}

fn escaped_comparison_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{`(<=|>=)`\}").expect("valid escaped comparison regex"))
}

fn comparison_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+[ \t]+)(<=|>=)([ \t]+\d+)").expect("valid comparison regex"))
}

fn opening_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[A-Za-z]").expect("valid opening tag regex"))
}

/// Applies the compatibility fixes outside code blocks, inline code, and existing
/// comments. Returns the fixed text and
/// the number of lines that changed.
pub fn apply_mdx_fixes(content: &str) -> (String, usize) {
    let mut out = String::with_capacity(content.len());
    let mut changed = 0;
    let mut prose = String::new();
    let mut fence: Option<String> = None;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match &fence {
            Some(marker) => {
                out.push_str(line);
                if trimmed.trim_end().starts_with(marker.as_str())
                    && trimmed.trim_end().chars().all(|c| c == marker.as_bytes()[0] as char)
                {
                    fence = None;
                }
            }
            None => {
                if let Some(marker) = fence_marker(trimmed) {
                    changed += flush(&mut prose, &mut out);
                    out.push_str(line);
                    fence = Some(marker);
                } else {
                    prose.push_str(line);
                }
            }
        }
    }
    changed += flush(&mut prose, &mut out);
    (out, changed)
}

fn fence_marker(trimmed: &str) -> Option<String> {
    for ch in ['`', '~'] {
        let count = trimmed.chars().take_while(|&c| c == ch).count();
        if count >= 3 {
            return Some(ch.to_string().repeat(count));
        }
    }
    None
}

fn flush(prose: &mut String, out: &mut String) -> usize {
    if prose.is_empty() {
        return 0;
    }
    let fixed = fix_prose(prose);
    let changed = prose
        .lines()
        .zip(fixed.lines())
        .filter(|(before, after)| before != after)
        .count();
    out.push_str(&fixed);
    prose.clear();
    changed
}

fn fix_prose(text: &str) -> String {
    let text = escaped_comparison_regex().replace_all(text, "$1");
    let tree = MarkupTree::parse(&text);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for range in tree.inert_ranges() {
        if range.end <= cursor {
            continue;
        }
        let start = range.start.max(cursor);
        out.push_str(&fix_segment(&text[cursor..start]));
        out.push_str(&text[start..range.end]);
        cursor = range.end;
    }
    out.push_str(&fix_segment(&text[cursor..]));
    out
}

/// Fixes a run of text that holds no code spans or comments.
fn fix_segment(text: &str) -> String {
    let text = text.replace("&lt;/", "</").replace("/&gt;", "/>");
    let text = tag_regex().replace_all(&text, |caps: &Captures<'_>| {
        caps[0].replace("&gt;", ">").replace("&lt;", "<")
    });
    let text = trailing_gt_regex().replace_all(&text, ">$1");

    text.split_inclusive('\n')
        .map(|line| {
            if has_tag_syntax(line) || is_indented_code(line) {
                line.to_string()
            } else {
                comparison_regex()
                    .replace_all(line, "$1`$2`$3")
                    .into_owned()
            }
        })
        .collect()
}

fn has_tag_syntax(line: &str) -> bool {
    line.contains('<')
        && line.contains('>')
        && (["class=", "src=", "alt=", "className=", "/>", "</"]
            .iter()
            .any(|marker| line.contains(marker))
            || opening_tag_regex().is_match(line))
}

fn is_indented_code(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}
