pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "slotbook",
    about = "Slotbook operator CLI",
    long_about = "Apply migrations, inspect configuration, check readiness, and query reviewer schedules.",
    after_help = "Examples:\n  slotbook doctor --json\n  slotbook roster coding-challenge 7 2024 --tech rust\n  slotbook schedule U024BE7LH 0 2024"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack signing readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "List reviewers available for a challenge in a week, grouped by day and slot"
    )]
    Roster {
        #[arg(help = "Challenge setup ID")]
        challenge: String,
        #[arg(help = "Week number (0 for the General week)")]
        week: u32,
        year: i32,
        #[arg(
            long,
            default_value = "",
            help = "Only reviewers whose technology list contains this text"
        )]
        tech: String,
    },
    #[command(about = "Show a reviewer's resolved availability and bookings for a week")]
    Schedule {
        #[arg(help = "Slack user ID of the reviewer")]
        user: String,
        #[arg(help = "Week number (0 for the General week)")]
        week: u32,
        year: i32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Roster { challenge, week, year, tech } => {
            commands::roster::run(&challenge, week, year, &tech)
        }
        Command::Schedule { user, week, year } => commands::schedule::run(&user, week, year),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
