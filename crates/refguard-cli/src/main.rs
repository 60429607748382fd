use std::process::ExitCode;

fn main() -> ExitCode {
    refguard_cli::run()
}
