//! I/O adapters: configuration, Markdown input, and the interpreter process.

pub mod config;
pub mod markdown;
pub mod session;
