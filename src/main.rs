mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

impl Context {
    pub fn config(&self) -> Result<config::Config> {
        config::Config::load(self.config_path.as_deref())
    }
}

/// Exit status for a failed run: 2 when the web server may be serving a
/// stale configuration, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<vhostkit::Error>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
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
        config_path: cli.config,
    };
    log::trace!("verbosity {}", ctx.verbose);

    let result = match cli.command.unwrap_or(Command::Prompt) {
        Command::List => commands::list::run(&ctx),
        Command::Show { name } => commands::show::run(&ctx, &name),
        Command::Create { name } => commands::create::run(&ctx, &name),
        Command::Destroy { name, yes } => commands::destroy::run(&ctx, &name, yes),
        Command::Prompt => commands::prompt::run(&ctx),
        Command::Serve { bind } => commands::serve::run(&ctx, bind),
        Command::Init { force } => commands::init::run(&ctx, force),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "vhostctl", &mut io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::report(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}
