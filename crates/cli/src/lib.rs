pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "prwatch",
    about = "prwatch operator CLI",
    long_about = "Check readiness, show the effective configuration, preview calendar triggers.",
    after_help = "Examples:\n  prwatch doctor --json\n  prwatch config\n  prwatch calendar team.ics"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack tokens, pull request integrations and calendars")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Parse an ICS file and list the commands its events would trigger")]
    Calendar {
        #[arg(help = "Path to an .ics file")]
        path: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Calendar { path } => commands::calendar::run(&path),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
