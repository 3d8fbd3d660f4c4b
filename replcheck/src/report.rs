//! Failure reports: a reproduction file plus a human-readable diagnostic.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use similar::{ChangeTag, TextDiff};
use tracing::{debug, instrument};

use crate::core::types::{Failure, Verdict};
use crate::io::config::InterpreterConfig;

/// Where and how to write the reproduction file.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// File name prefix, usually the document's stem.
    pub prefix: String,
    /// File name suffix, e.g. `.lisp`.
    pub suffix: String,
    /// Directory for the file; the system temp dir when `None`.
    pub dir: Option<PathBuf>,
    /// Interpreter whose load command goes into the replay instructions.
    pub interpreter: InterpreterConfig,
}

/// Artifacts produced for a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub diagnostic: String,
    pub artifact_path: PathBuf,
}

/// Write the reproduction file and render the diagnostic for `failure`.
#[instrument(skip_all, fields(number = failure.number))]
pub fn report_failure(failure: &Failure, options: &ReportOptions) -> Result<Report> {
    if failure.verdict.is_success() {
        bail!("cannot report a successful example");
    }
    let artifact_path = write_reproduction(&failure.evaluated_forms, options)?;
    let replay = options.interpreter.replay_command(&artifact_path);
    let diagnostic = render_diagnostic(failure, &replay);
    debug!(artifact = %artifact_path.display(), "wrote reproduction file");
    Ok(Report {
        diagnostic,
        artifact_path,
    })
}

/// Persist `forms`, newline-separated, to a fresh temporary file.
pub fn write_reproduction(forms: &[String], options: &ReportOptions) -> Result<PathBuf> {
    let prefix = format!("{}_", options.prefix);
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(&options.suffix);
    let mut file = match &options.dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .context("create reproduction file")?;

    file.write_all(forms.join("\n").as_bytes())
        .context("write reproduction file")?;
    file.flush().context("flush reproduction file")?;

    let path = file
        .into_temp_path()
        .keep()
        .context("keep reproduction file")?;
    Ok(path)
}

/// Reason for the failure, then how to get back to the failing state.
pub fn render_diagnostic(failure: &Failure, replay: &str) -> String {
    let reason = match &failure.verdict {
        Verdict::ProcessExited => "Exited REPL unexpectedly.\n".to_string(),
        // the interpreter's own error text is already in the transcript
        Verdict::Timeout => "Timeout: either took too long or an error occurred.\n".to_string(),
        Verdict::OutputMismatch { actual } => {
            let expected = failure.example.expected_output.as_deref().unwrap_or("");
            render_diff(expected, actual)
        }
        Verdict::Success => String::new(),
    };

    let mut lines = vec![
        reason,
        "To reproduce this in a REPL, first evaluate all the forms up to".to_string(),
        "but not including this one by running the following command:".to_string(),
        String::new(),
        format!("    {replay}"),
        String::new(),
        "Then evaluate the erroneous form:".to_string(),
        String::new(),
    ];
    lines.extend(failure.example.code.lines().map(|line| format!("    {line}")));
    lines.join("\n")
}

/// Line diff of `expected` against `actual`, one marked line per change.
pub fn render_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut out = String::from("Differences (-expected +actual):\n\n");
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push_str("    ");
        out.push(sign);
        out.push(' ');
        out.push_str(change.value());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}
