//! Check that code examples in a Markdown document run in an interactive
//! interpreter and print what the document says they print.
//!
//! Examples are code blocks tagged with the configured language (`lisp` by
//! default). An untagged code block right after an example holds its expected
//! output. Examples are replayed in order into one long-lived interpreter
//! session; the first failure stops the run and produces a reproduction file.
//!
//! - **[`core`]**: Pure, deterministic logic (tree model, extraction, output
//!   normalization, prompt recognition). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, Markdown files, the
//!   interpreter process).
//!
//! [`verify`], [`report`] and [`check`] tie the two together.

pub mod check;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
