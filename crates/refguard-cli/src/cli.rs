use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use crate::commands;
use crate::context::{CliSession, Verbosity};
use crate::error::{CliError, ExitStatus};
use crate::formatter::{OutputFormat, emit_result};

const NAME: &str = "refguard";

pub fn run() -> ExitCode {
    match run_cli(std::env::args()) {
        Ok(code) => code,
        Err(err) => {
            err.print();
            err.exit_code()
        }
    }
}

/// Parses CLI arguments, loads configuration for the project, and dispatches to the
/// requested command. Returns a `sysexits`-compatible `ExitCode`.
pub fn run_cli<I, S>(args: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let command = build_cli();
    let matches = command.try_get_matches_from(args)?;

    let verbosity = Verbosity {
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    };
    init_tracing(verbosity.verbose);
    let output = if verbosity.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let session = CliSession::bootstrap(
        matches.get_one::<String>("project").cloned(),
        matches.get_one::<String>("config").cloned(),
        verbosity,
    )?;
    if session.verbosity.verbose {
        tracing::info!(
            project = %session.project.display(),
            config = ?session.config.source,
            "resolved project context"
        );
    }

    let result = dispatch(&session, &matches)?;
    emit_result(result, output)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn build_cli() -> Command {
    Command::new(NAME)
        .about("Keeps links, images, and component references in a Markdown/MDX corpus resolvable")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("project")
                .long("project")
                .global(true)
                .value_name("DIR")
                .help("Project directory holding configuration and logs. Defaults to the current directory."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("PATH")
                .help("Explicit configuration file. Must exist."),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit a JSON object instead of human-readable text."),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log phase boundaries and configuration lookups to stderr."),
        )
        .subcommand_required(true)
        .subcommand(commands::fix::command())
        .subcommand(commands::check::command())
        .subcommand(commands::map::command())
}

fn dispatch(
    session: &CliSession,
    matches: &ArgMatches,
) -> Result<commands::CommandResult, CliError> {
    match matches.subcommand() {
        Some(("fix", sub)) => commands::fix::run(session, sub),
        Some(("check", sub)) => commands::check::run(session, sub),
        Some(("map", sub)) => commands::map::run(session, sub),
        _ => Err(CliError::new("missing command", ExitStatus::Usage)),
    }
}
