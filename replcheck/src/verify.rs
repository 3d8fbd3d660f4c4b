//! Fail-fast verification of examples against a live interpreter.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::normalize::normalize_output;
use crate::core::types::{Example, Failure, RunResult, Verdict};
use crate::io::session::Repl;

/// Drives a [`Repl`] through examples, one turn per example.
///
/// Every turn is echoed to `transcript` as it would appear in an interactive
/// session. Code of successful examples accumulates in order so a failure can
/// be reproduced from a fresh interpreter.
pub struct Verifier<R, W> {
    repl: R,
    transcript: W,
    prompt: String,
    evaluated_forms: Vec<String>,
}

impl<R: Repl, W: Write> Verifier<R, W> {
    /// `prompt` is the text shown in front of each example in the transcript.
    pub fn new(repl: R, transcript: W, prompt: &str) -> Self {
        Self {
            repl,
            transcript,
            prompt: prompt.to_string(),
            evaluated_forms: Vec::new(),
        }
    }

    /// Code of every example that has succeeded so far, in evaluation order.
    pub fn evaluated_forms(&self) -> &[String] {
        &self.evaluated_forms
    }

    /// Evaluate one example and classify the outcome.
    ///
    /// On success the example's code is appended to the evaluated forms;
    /// any other verdict leaves them untouched.
    #[instrument(skip_all)]
    pub fn verify(&mut self, example: &Example) -> Result<Verdict> {
        let evaluation = self.repl.evaluate(&example.code)?;
        let actual = normalize_output(&evaluation.raw);
        self.log_turn(&example.code, &actual)?;

        let verdict = match evaluation.verdict {
            // an empty output block documents nothing to compare against
            Verdict::Success => match &example.expected_output {
                Some(expected) if !expected.is_empty() && *expected != actual => {
                    Verdict::OutputMismatch { actual }
                }
                _ => Verdict::Success,
            },
            other => other,
        };

        if verdict.is_success() {
            self.evaluated_forms.push(example.code.clone());
        }
        debug!(verdict = verdict.label(), "example verified");
        Ok(verdict)
    }

    /// Verify `examples` in order, stopping at the first non-success.
    #[instrument(skip_all, fields(examples = examples.len()))]
    pub fn run(&mut self, examples: &[Example]) -> Result<RunResult> {
        for (index, example) in examples.iter().enumerate() {
            let verdict = self.verify(example)?;
            if !verdict.is_success() {
                info!(number = index + 1, verdict = verdict.label(), "example failed");
                return Ok(RunResult {
                    passed: index,
                    failure: Some(Failure {
                        number: index + 1,
                        example: example.clone(),
                        verdict,
                        evaluated_forms: self.evaluated_forms.clone(),
                    }),
                });
            }
        }
        info!(passed = examples.len(), "all examples passed");
        Ok(RunResult {
            passed: examples.len(),
            failure: None,
        })
    }

    pub fn into_inner(self) -> (R, W) {
        (self.repl, self.transcript)
    }

    /// Echo a turn as `<prompt><code>` followed by the captured output.
    fn log_turn(&mut self, code: &str, actual: &str) -> Result<()> {
        let separator = format!("\n{}", " ".repeat(self.prompt.chars().count()));
        let shown = code.lines().collect::<Vec<_>>().join(separator.as_str());
        writeln!(self.transcript, "{}{}\n{}", self.prompt, shown, actual)
            .and_then(|()| self.transcript.flush())
            .context("write transcript")
    }
}
