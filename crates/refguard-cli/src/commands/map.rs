use clap::{Arg, ArgMatches, Command};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("map")
        .about("Show which documents import each partial")
        .arg(
            Arg::new("root")
                .value_name("ROOT")
                .help("Corpus root, relative to the project directory. Defaults to docs."),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let root = session.corpus_root(matches.get_one::<String>("root"));
    let engine = session.engine(&root)?;
    let report = engine.transclusion()?;

    Ok(CommandResult::Map {
        root: engine.layout().root().display().to_string(),
        report,
    })
}
