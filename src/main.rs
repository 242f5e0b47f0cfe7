mod cli;
mod commands;
mod config;
mod display;
mod journal;
mod paths;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use commands::Outcome;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let controller = &cli.controller;

    let result = match &cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, controller, args),
        Command::Diff(args) => commands::diff::run(&ctx, controller, args),
        Command::Validate(args) => commands::validate::run(&ctx, args),
        Command::Sync(args) => commands::sync::run(&ctx, controller, args),
        Command::Rollback(args) => commands::rollback::run(&ctx, controller, args),
        Command::Health => commands::health::run(&ctx, controller),
        Command::Devices => commands::devices::run(&ctx, controller),
        Command::History { limit } => commands::history::run(&ctx, *limit),
        Command::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "netintent", &mut io::stdout());
            Ok(Outcome::Success)
        }
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            ui::error(&format!("{e:#}"));
            Outcome::Failed.exit_code()
        }
    }
}
