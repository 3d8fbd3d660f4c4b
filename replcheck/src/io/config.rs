//! Checker configuration stored in `replcheck.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at a Quicklisp installation.
pub const QUICK_LISP_ENV: &str = "QUICK_LISP";

/// Checker configuration (TOML).
///
/// Missing fields default to an SBCL session checking `lisp` blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckConfig {
    /// Language tag that marks a code block as an example.
    pub language: String,

    /// Deadline for each example, in milliseconds.
    pub eval_timeout_ms: u64,

    /// Deadline for the interpreter's first prompt, in milliseconds.
    pub startup_timeout_ms: u64,

    /// How long to wait for the interpreter to exit after closing its input.
    pub shutdown_grace_ms: u64,

    pub interpreter: InterpreterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Program to spawn (e.g. `sbcl`).
    pub command: String,

    /// Startup arguments. When empty, Quicklisp is loaded if `QUICK_LISP` is set.
    pub args: Vec<String>,

    /// Prompt printed at the start of a line when the interpreter is ready.
    pub prompt: String,

    /// Flag that makes the interpreter load a file, used in replay instructions.
    pub load_flag: String,

    /// File extension for reproduction files.
    pub artifact_suffix: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            command: "sbcl".to_string(),
            args: Vec::new(),
            prompt: "* ".to_string(),
            load_flag: "--load".to_string(),
            artifact_suffix: ".lisp".to_string(),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            language: "lisp".to_string(),
            eval_timeout_ms: 30_000,
            startup_timeout_ms: 60_000,
            shutdown_grace_ms: 2_000,
            interpreter: InterpreterConfig::default(),
        }
    }
}

impl CheckConfig {
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(anyhow!("language must be non-empty"));
        }
        if self.eval_timeout_ms == 0 {
            return Err(anyhow!("eval_timeout_ms must be > 0"));
        }
        if self.startup_timeout_ms == 0 {
            return Err(anyhow!("startup_timeout_ms must be > 0"));
        }
        if self.interpreter.command.trim().is_empty() {
            return Err(anyhow!("interpreter.command must be non-empty"));
        }
        if self.interpreter.prompt.is_empty() {
            return Err(anyhow!("interpreter.prompt must be non-empty"));
        }
        Ok(())
    }

    pub fn eval_timeout(&self) -> Duration {
        Duration::from_millis(self.eval_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Override the per-example deadline with fractional seconds from the CLI.
    pub fn set_eval_timeout_secs(&mut self, secs: f64) -> Result<()> {
        let timeout = Duration::try_from_secs_f64(secs)
            .map_err(|_| anyhow!("timeout must be a non-negative number of seconds"))?;
        let millis = u64::try_from(timeout.as_millis()).context("timeout too large")?;
        if millis == 0 {
            return Err(anyhow!("timeout must be at least 1ms"));
        }
        self.eval_timeout_ms = millis;
        Ok(())
    }
}

impl InterpreterConfig {
    /// Arguments to spawn the interpreter with.
    ///
    /// `quick_lisp` is the value of [`QUICK_LISP_ENV`], passed in so callers
    /// (and tests) decide where it comes from.
    pub fn startup_args(&self, quick_lisp: Option<&str>) -> Vec<String> {
        if !self.args.is_empty() {
            return self.args.clone();
        }
        match quick_lisp {
            Some(dir) if !dir.is_empty() => vec![
                self.load_flag.clone(),
                format!("{}/setup.lisp", dir.trim_end_matches('/')),
            ],
            _ => Vec::new(),
        }
    }

    /// Shell line that loads `artifact` into a fresh interpreter.
    pub fn replay_command(&self, artifact: &Path) -> String {
        format!(
            "{} {} {}",
            self.command,
            self.load_flag,
            artifact.display()
        )
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CheckConfig::default()`.
pub fn load_config(path: &Path) -> Result<CheckConfig> {
    if !path.exists() {
        let cfg = CheckConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CheckConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
