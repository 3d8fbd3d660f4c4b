//! Shared deterministic types for checker core logic.
//!
//! These types define stable contracts between the extractor, the session
//! driver, the verifier and the reporter.

/// One interpreter-checkable code sample found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// Literal text of the code block (non-empty).
    pub code: String,
    /// Text of the untagged code block that immediately follows, if any.
    pub expected_output: Option<String>,
}

/// Classification of a single turn.
///
/// Every variant except `Success` ends the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The interpreter printed its next prompt (and the output matched, if checked).
    Success,
    /// The prompt came back but the normalized capture differs from the documented output.
    OutputMismatch { actual: String },
    /// The interpreter closed its output stream mid-run.
    ProcessExited,
    /// No prompt appeared before the per-example deadline.
    Timeout,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    /// Short stable label used in summary lines.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Success => "success",
            Verdict::OutputMismatch { .. } => "mismatch",
            Verdict::ProcessExited => "exited",
            Verdict::Timeout => "timeout",
        }
    }
}

/// Result of one send/receive cycle with the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// `Success`, `ProcessExited` or `Timeout`; content is compared by the verifier.
    pub verdict: Verdict,
    /// Bytes emitted before the prompt, end of stream, or deadline.
    pub raw: Vec<u8>,
}

/// The first non-successful example of a run and the state needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// 1-indexed position of the example in extraction order.
    pub number: usize,
    pub example: Example,
    pub verdict: Verdict,
    /// Code of every example that succeeded before this one, in order.
    pub evaluated_forms: Vec<String>,
}

/// Aggregate outcome of verifying a sequence of examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Number of examples that succeeded.
    pub passed: usize,
    pub failure: Option<Failure>,
}

impl RunResult {
    pub fn all_passed(&self) -> bool {
        self.failure.is_none()
    }
}
