use crate::document::Document;
use crate::markup::{Edit, MarkupTree, apply_edits};
use crate::report::{RecordDetail, RewriteReason, RewriteRecord};
use crate::transclusion::{import_regex, references_partials};
use crate::workspace::{CorpusLayout, relative_path};

/// Rewrites root-absolute partial imports (`/services/reference/_partials/x.mdx`) to
/// paths relative to the importing document. Both forms name the same partial, so the
/// transclusion relation is unaffected.
pub fn normalize_partial_imports(
    doc: &mut Document,
    file: &str,
    layout: &CorpusLayout,
) -> Vec<RewriteRecord> {
    let tree = MarkupTree::parse(&doc.content);
    let mut edits = Vec::new();
    let mut records = Vec::new();

    for caps in import_regex().captures_iter(&doc.content) {
        let (Some(whole), Some(ident), Some(path)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let target = path.as_str();
        if !target.starts_with('/')
            || tree.is_inert(&whole.range())
            || !references_partials(layout, target)
        {
            continue;
        }

        let resolved = layout.resolve_root_absolute(target);
        let mut relative = relative_path(doc.dir(), &resolved);
        if !relative.starts_with('.') {
            relative.insert_str(0, "./");
        }

        tracing::debug!(file, from = target, to = %relative, "normalized partial import");
        records.push(RewriteRecord {
            file: file.to_string(),
            original: target.to_string(),
            replacement: Some(relative.clone()),
            text: ident.as_str().to_string(),
            detail: RecordDetail::LinkRewrite {
                reason: RewriteReason::PartialImport,
            },
        });
        edits.push(Edit::new(path.range(), relative));
    }

    if !edits.is_empty() {
        doc.content = apply_edits(&doc.content, edits);
    }
    records
}
