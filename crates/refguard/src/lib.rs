pub mod components;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod images;
pub mod links;
pub mod markup;
pub mod mdx_compat;
pub mod partials;
pub mod report;
pub mod scanner;
pub mod transclusion;
pub mod workspace;

pub use components::disable_components;
pub use config::{
    ComponentSettings, ImageSettings, LoadedConfig, PatternRule, RefguardConfig, RepairRule,
    load_config, parse_config,
};
pub use document::{Document, SkippedFile, load_documents};
pub use engine::{Engine, PartialUsage, RunOptions, TransclusionReport};
pub use error::RefguardError;
pub use images::canonicalize_images;
pub use links::{LinkClass, LinkPass, LinkResolver, RepairTable, ReplacementRules, classify};
pub use markup::{Edit, MarkupTree, apply_edits};
pub use mdx_compat::apply_mdx_fixes;
pub use partials::normalize_partial_imports;
pub use report::{
    BrokenLinkExample, ComponentKind, LinkStats, RecordDetail, RewriteCategory, RewriteReason,
    RewriteRecord, RunReport, Summary, write_reports,
};
pub use scanner::{CorpusScan, DocumentEntry, DocumentKind, scan_corpus};
pub use transclusion::TransclusionMap;
pub use workspace::{CorpusLayout, CorpusSettings, normalize_path_lexical, relative_display};
