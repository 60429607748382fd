use clap::{Arg, ArgMatches, Command};
use refguard::RunOptions;

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("check")
        .about("Dry-run the corpus and fail when any document would change")
        .arg(
            Arg::new("root")
                .value_name("ROOT")
                .help("Corpus root, relative to the project directory. Defaults to docs."),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let root = session.corpus_root(matches.get_one::<String>("root"));
    let engine = session.engine(&root)?;
    let report = engine.run(RunOptions { dry_run: true })?;

    Ok(CommandResult::Check {
        root: engine.layout().root().display().to_string(),
        summary: report.summary(),
        pending: report.changed_files,
    })
}
