use std::process::ExitCode;

fn main() -> ExitCode {
    prwatch_cli::run()
}
