//! Orchestration for checking one Markdown document end to end.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::extract::extract_examples;
use crate::core::types::Failure;
use crate::io::config::{CheckConfig, QUICK_LISP_ENV};
use crate::io::markdown::read_document;
use crate::io::session::{ReplSession, SessionRequest};
use crate::report::{Report, ReportOptions, report_failure};
use crate::verify::Verifier;

/// Inputs for a single document check.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub document: PathBuf,
    pub config: CheckConfig,
    /// Value of `QUICK_LISP`, used when no interpreter args are configured.
    pub quick_lisp: Option<String>,
    /// Directory for the reproduction file; the system temp dir when `None`.
    pub artifact_dir: Option<PathBuf>,
}

impl CheckRequest {
    /// Request for `document` with `QUICK_LISP` taken from the environment.
    pub fn from_env(document: PathBuf, config: CheckConfig) -> Self {
        Self {
            document,
            config,
            quick_lisp: std::env::var(QUICK_LISP_ENV).ok(),
            artifact_dir: None,
        }
    }
}

/// Result of checking a document.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Passed { examples: usize },
    Failed { failure: Failure, report: Report },
}

/// Extract the document's examples and replay them in a fresh interpreter.
///
/// The session transcript is written to `transcript` as the run progresses.
/// The interpreter is shut down before the failure report is produced.
#[instrument(skip_all, fields(document = %request.document.display()))]
pub fn check_document<W: Write>(request: &CheckRequest, transcript: W) -> Result<CheckOutcome> {
    let config = &request.config;
    let root = read_document(&request.document)?;
    let examples = extract_examples(&root, &config.language);
    info!(examples = examples.len(), language = %config.language, "extracted examples");

    let session = ReplSession::start(&session_request(config, request.quick_lisp.as_deref()))?;
    let result = {
        let mut verifier = Verifier::new(session, transcript, &config.interpreter.prompt);
        verifier.run(&examples)?
    };

    let Some(failure) = result.failure else {
        return Ok(CheckOutcome::Passed {
            examples: result.passed,
        });
    };

    let options = ReportOptions {
        prefix: document_stem(&request.document),
        suffix: config.interpreter.artifact_suffix.clone(),
        dir: request.artifact_dir.clone(),
        interpreter: config.interpreter.clone(),
    };
    let report = report_failure(&failure, &options)?;
    Ok(CheckOutcome::Failed { failure, report })
}

fn session_request(config: &CheckConfig, quick_lisp: Option<&str>) -> SessionRequest {
    SessionRequest {
        command: config.interpreter.command.clone(),
        args: config.interpreter.startup_args(quick_lisp),
        prompt: config.interpreter.prompt.clone(),
        eval_timeout: config.eval_timeout(),
        startup_timeout: config.startup_timeout(),
        shutdown_grace: config.shutdown_grace(),
    }
}

fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
