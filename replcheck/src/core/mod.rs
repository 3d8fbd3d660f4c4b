//! Deterministic, pure logic shared by the checker.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod document;
pub mod extract;
pub mod normalize;
pub mod prompt;
pub mod types;
