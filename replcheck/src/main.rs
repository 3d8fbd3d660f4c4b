//! Check Lisp examples in a Markdown file against a live REPL.
//!
//! The whole REPL session is printed to stdout. If the session exits
//! unexpectedly, an evaluation times out, or an output does not match, a
//! diagnostic and reproduction instructions are printed to stderr.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use replcheck::check::{CheckOutcome, CheckRequest, check_document};
use replcheck::exit_codes;
use replcheck::io::config::load_config;
use replcheck::logging;

#[derive(Parser)]
#[command(
    name = "replcheck",
    version,
    about = "Check that Lisp examples in a Markdown file run in a REPL and print the documented output"
)]
struct Cli {
    /// Seconds allowed for each example (overrides the config file).
    #[arg(long)]
    timeout: Option<f64>,

    /// Config file; defaults apply when it does not exist.
    #[arg(long, default_value = "replcheck.toml")]
    config: PathBuf,

    /// Markdown file to check.
    file: PathBuf,
}

fn main() {
    logging::init();
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = load_config(&cli.config)?;
    if let Some(secs) = cli.timeout {
        config.set_eval_timeout_secs(secs)?;
    }

    let request = CheckRequest::from_env(cli.file, config);
    let outcome = check_document(&request, io::stdout().lock())?;
    match outcome {
        CheckOutcome::Passed { examples } => {
            println!(
                "check: file={} examples={} passed={}",
                request.document.display(),
                examples,
                examples
            );
            Ok(exit_codes::OK)
        }
        CheckOutcome::Failed { failure, report } => {
            eprintln!(
                "check: file={} example=#{} verdict={}",
                request.document.display(),
                failure.number,
                failure.verdict.label()
            );
            eprintln!("{}", report.diagnostic);
            Ok(exit_codes::FAILED)
        }
    }
}
