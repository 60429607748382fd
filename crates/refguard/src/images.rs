use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::config::ImageSettings;
use crate::document::Document;
use crate::markup::{Edit, MarkupTree, apply_edits};
use crate::report::{RecordDetail, RewriteRecord};

/// `images/` reached through `./` or any number of `../` segments.
const IMAGES_PREFIX: &str = r"(?:\./|(?:\.\./)+)images/";

fn src_attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r#"src=\{{require\(["']{IMAGES_PREFIX}([^"']+)["']\)\.default\}}"#
        ))
        .expect("valid src attribute regex")
    })
}

fn require_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r#"require\(["']{IMAGES_PREFIX}([^"']+)["']\)"#))
            .expect("valid require regex")
    })
}

fn markdown_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r#"!\[([^\]]*)\]\({IMAGES_PREFIX}([^)\s]+)(\s+"[^"]*")?\)"#
        ))
        .expect("valid markdown image regex")
    })
}

/// Rewrites every image reference that walks up into an `images/` directory to the
/// site's static image root, keeping the subpath below `images/`. The number of `../`
/// segments never affects the output.
pub fn canonicalize_images(
    doc: &mut Document,
    file: &str,
    settings: &ImageSettings,
) -> Vec<RewriteRecord> {
    let tree = MarkupTree::parse(&doc.content);
    let module_prefix = settings.module_prefix.trim_end_matches('/');
    let site_prefix = settings.site_prefix.trim_end_matches('/');

    let mut found = Vec::new();
    // Attribute form first: a bare `require` inside it overlaps and is dropped.
    collect(&doc.content, &tree, src_attribute_regex(), &mut found, |caps| {
        let image = caps.get(1)?.as_str();
        Some((format!("src=\"{site_prefix}/{image}\""), image.to_string()))
    });
    collect(&doc.content, &tree, require_regex(), &mut found, |caps| {
        let image = caps.get(1)?.as_str();
        Some((format!("require('{module_prefix}/{image}')"), image.to_string()))
    });
    collect(&doc.content, &tree, markdown_image_regex(), &mut found, |caps| {
        let alt = caps.get(1).map_or("", |m| m.as_str());
        let image = caps.get(2)?.as_str();
        let title = caps.get(3).map_or("", |m| m.as_str());
        Some((format!("![{alt}]({site_prefix}/{image}{title})"), image.to_string()))
    });

    if found.is_empty() {
        return Vec::new();
    }

    // Keep only rewrites that do not overlap an earlier one.
    found.sort_by_key(|(range, _)| (range.start, range.end));
    let mut cursor = 0;
    found.retain(|(range, _)| {
        let keep = range.start >= cursor;
        if keep {
            cursor = range.end;
        }
        keep
    });

    let mut edits = Vec::with_capacity(found.len());
    let mut records = Vec::with_capacity(found.len());
    for (range, (replacement, image)) in found {
        let original = doc.content[range.clone()].to_string();
        records.push(RewriteRecord {
            file: file.to_string(),
            original,
            replacement: Some(replacement.clone()),
            text: image.clone(),
            detail: RecordDetail::Image { image },
        });
        edits.push(Edit::new(range, replacement));
    }

    doc.content = apply_edits(&doc.content, edits);
    tracing::debug!(file, images = records.len(), "canonicalized image references");
    records
}

type Rewrite = (Range<usize>, (String, String));

fn collect(
    content: &str,
    tree: &MarkupTree,
    regex: &Regex,
    found: &mut Vec<Rewrite>,
    render: impl Fn(&Captures<'_>) -> Option<(String, String)>,
) {
    for caps in regex.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if tree.is_inert(&whole.range()) {
            continue;
        }
        if let Some(rewrite) = render(&caps) {
            found.push((whole.range(), rewrite));
        }
    }
}
