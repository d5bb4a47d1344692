use sanitize_core::{CliArgs, Command as CoreCommand, CoreError, Reporter, run};
mod interaction;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use console::style;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Conventional status for a run stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn print_completions_cli(shell: clap_complete::Shell) {
    let mut cmd = CliArgs::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli: CliArgs = CliArgs::parse();

    if let Some(command_enum_val) = cli.command {
        match command_enum_val {
            CoreCommand::Completion(args) => {
                print_completions_cli(args.shell);
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    let main_app_args = cli.main_opts;
    let reporter = Reporter::new(main_app_args.verbosity());

    if main_app_args.quiet && main_app_args.dry_run {
        reporter.warn("--quiet with --dry-run prints nothing about the files that would change.");
    }

    let options = match main_app_args.run_options() {
        Ok(options) => options,
        Err(e @ CoreError::RootNotFound(_)) => {
            eprintln!("{} {}", style("Error:").red(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let allow = options.policy.allow.as_ref().map(|a| a.entries());
    reporter.banner(
        &options.root,
        allow.as_deref(),
        options.rewrite.dry_run,
        options.rewrite.backup_root.is_some(),
    );

    let needs_confirmation = !options.rewrite.dry_run && options.rewrite.backup_root.is_none();
    if needs_confirmation {
        match interaction::confirm_processing(&options.root, main_app_args.yes) {
            Ok(true) => {}
            Ok(false) => return Ok(ExitCode::SUCCESS),
            Err(e) => {
                eprintln!(
                    "{}",
                    style(format!("Error during confirmation: {}", e)).red()
                );
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let abort = Arc::new(AtomicBool::new(false));
    let ctrl_c_flag = Arc::clone(&abort);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_flag.store(true, Ordering::Relaxed);
            eprintln!(
                "{}",
                style("Interrupt received: finishing the current file, then stopping.").yellow()
            );
        }
    });

    let dry_run = options.rewrite.dry_run;
    let worker_abort = Arc::clone(&abort);
    let summary = tokio::task::spawn_blocking(move || run(&options, &reporter, &worker_abort))
        .await
        .context("Sanitize worker panicked")?;

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    reporter.summary(&summary, dry_run);

    if summary.aborted {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
