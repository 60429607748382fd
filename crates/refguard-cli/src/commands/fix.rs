use clap::{Arg, ArgAction, ArgMatches, Command};
use refguard::{RunOptions, write_reports};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("fix")
        .about("Repair or neutralize every reference in the corpus and write audit logs")
        .arg(
            Arg::new("root")
                .value_name("ROOT")
                .help("Corpus root, relative to the project directory. Defaults to docs."),
        )
        .arg(
            Arg::new("logs")
                .long("logs")
                .value_name("DIR")
                .help("Directory for audit logs. Defaults to <project>/_maintainers/logs."),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Report what would change without writing documents or logs."),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let root = session.corpus_root(matches.get_one::<String>("root"));
    let dry_run = matches.get_flag("dry-run");
    let engine = session.engine(&root)?;

    let report = engine.run(RunOptions { dry_run })?;

    let logs = if dry_run {
        None
    } else {
        let dir = session.log_dir(matches.get_one::<String>("logs"));
        write_reports(&report, &dir)?;
        Some(dir.display().to_string())
    };

    Ok(CommandResult::Fix {
        root: engine.layout().root().display().to_string(),
        summary: report.summary(),
        logs,
    })
}
