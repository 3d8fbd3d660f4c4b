//! Stable exit codes for the `replcheck` CLI.

/// Every example ran and matched its documented output.
pub const OK: i32 = 0;
/// An example failed: output mismatch, interpreter exit, or timeout.
pub const FAILED: i32 = 1;
/// Invalid config or document, or the interpreter never became ready.
pub const INVALID: i32 = 2;
