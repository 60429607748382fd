use std::process::ExitCode;

use refguard::Summary;
use serde_json::json;

use crate::commands::CommandResult;
use crate::error::CliError;

pub enum OutputFormat {
    Text,
    Json,
}

/// Renders a `CommandResult` as human-readable text or a single JSON object and
/// converts the outcome into an exit code.
pub fn emit_result(result: CommandResult, format: OutputFormat) -> Result<ExitCode, CliError> {
    match format {
        OutputFormat::Text => print_text(&result),
        OutputFormat::Json => print_json(&result)?,
    };
    Ok(ExitCode::from(result.exit_status().code()))
}

fn print_text(result: &CommandResult) {
    match result {
        CommandResult::Fix {
            root,
            summary,
            logs,
        } => {
            println!("Corpus: {root}");
            print_summary(summary);
            if let Some(dir) = logs {
                println!("Logs written to {dir}");
            }
        }
        CommandResult::Check {
            root,
            summary,
            pending,
        } => {
            println!("Corpus: {root}");
            if pending.is_empty() {
                println!("Corpus is clean ({} documents)", summary.documents);
                return;
            }
            println!("{} file(s) would change:", pending.len());
            for file in pending {
                println!("  - {file}");
            }
            print_summary(summary);
        }
        CommandResult::Map { root, report } => {
            println!("Corpus: {root}");
            println!("Partials with importers ({}):", report.partials.len());
            for usage in &report.partials {
                println!("  {}", usage.partial);
                for importer in &usage.importers {
                    println!("    <- {importer}");
                }
            }
            if !report.orphans.is_empty() {
                println!("Orphan partials ({}):", report.orphans.len());
                for orphan in &report.orphans {
                    println!("  - {orphan}");
                }
            }
        }
    }
}

fn print_summary(summary: &Summary) {
    let orphans = if summary.orphan_partials > 0 {
        format!(", {} orphaned", summary.orphan_partials)
    } else {
        String::new()
    };
    println!(
        "Processed {} documents ({} partials{orphans})",
        summary.documents, summary.partials
    );
    if summary.skipped_files > 0 {
        println!("Skipped {} unreadable or unwritable file(s)", summary.skipped_files);
    }

    if !summary.has_transformations() {
        println!("No transformations needed");
        return;
    }

    let verb = if summary.dry_run { "would change" } else { "changed" };
    println!("Files {verb}: {}", summary.changed_files);
    println!("  Image paths fixed: {}", summary.images);
    println!("  Component imports disabled: {}", summary.components);
    println!("  Links rewritten: {}", summary.link_rewrites);
    println!("  Broken links removed: {}", summary.broken_links);
    println!("  MDX compatibility fixes: {}", summary.mdx_fixes);

    if !summary.broken_examples.is_empty() {
        println!("Broken links:");
        for example in &summary.broken_examples {
            println!("  {}: [{}]({})", example.file, example.text, example.link);
        }
        let remaining = summary.remaining_broken();
        if remaining > 0 {
            println!("  ... and {remaining} more");
        }
    }
}

fn print_json(result: &CommandResult) -> Result<(), CliError> {
    let payload = json!(result);
    println!("{payload}");
    Ok(())
}
