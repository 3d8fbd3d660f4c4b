//! CLI tests for `replcheck`.
//!
//! Spawns the binary against a POSIX shell loop that prints `* ` whenever it
//! is ready, and verifies exit codes, the transcript on stdout, the
//! diagnostic on stderr, and the reproduction file.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use replcheck::exit_codes;
use replcheck::test_support::SH_REPL;

struct Workspace {
    temp: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("tmp")).expect("create tmp");
        let config = format!(
            "language = \"sh\"\neval_timeout_ms = 5000\nstartup_timeout_ms = 5000\n\n\
             [interpreter]\ncommand = \"sh\"\nargs = [\"-c\", '''\n{SH_REPL}''']\n\
             artifact_suffix = \".sh\"\n"
        );
        fs::write(temp.path().join("replcheck.toml"), config).expect("write config");
        Self { temp }
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn check(&self, markdown: &str, extra_args: &[&str]) -> Output {
        fs::write(self.path().join("README.md"), markdown).expect("write document");
        Command::new(env!("CARGO_BIN_EXE_replcheck"))
            .current_dir(self.path())
            .env("TMPDIR", self.path().join("tmp"))
            .env_remove("QUICK_LISP")
            .env_remove("RUST_LOG")
            .args(extra_args)
            .arg("README.md")
            .output()
            .expect("run replcheck")
    }

    fn artifacts(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(self.path().join("tmp"))
            .expect("read tmp")
            .map(|entry| entry.expect("entry").path())
            .collect();
        found.sort();
        found
    }

    fn only_artifact(&self) -> String {
        let artifacts = self.artifacts();
        assert_eq!(artifacts.len(), 1, "expected one artifact: {artifacts:?}");
        let name = artifacts[0]
            .file_name()
            .and_then(|name| name.to_str())
            .expect("artifact name");
        assert!(name.starts_with("README_") && name.ends_with(".sh"), "{name}");
        fs::read_to_string(&artifacts[0]).expect("read artifact")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn matching_example_passes_without_artifact() {
    let ws = Workspace::new();
    let output = ws.check("# Math\n\n```sh\necho 4\n```\n\n```\n4\n```\n", &[]);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("* echo 4\n4\n"), "{out}");
    assert!(out.contains("check: file=README.md examples=1 passed=1"), "{out}");
    assert!(ws.artifacts().is_empty());
}

#[test]
fn mismatch_stops_run_and_reports_diff() {
    let ws = Workspace::new();
    let markdown = "\
```sh
echo 1
```

```
1
```

```sh
echo 5
```

```
4
```

```sh
touch never-run
```
";
    let output = ws.check(markdown, &[]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let err = stderr(&output);
    assert!(err.contains("example=#2 verdict=mismatch"), "{err}");
    assert!(err.contains("Differences (-expected +actual):"), "{err}");
    assert!(err.contains("    - 4\n    + 5\n"), "{err}");
    assert!(err.contains("Then evaluate the erroneous form:\n\n    echo 5"), "{err}");
    assert_eq!(ws.only_artifact(), "echo 1\n");
    assert!(!ws.path().join("never-run").exists());

    let out = stdout(&output);
    assert!(out.contains("* echo 1\n1\n"), "{out}");
    assert!(out.contains("* echo 5\n5\n"), "{out}");
}

#[test]
fn interpreter_exit_is_reported() {
    let ws = Workspace::new();
    let markdown = "```sh\necho 1\n```\n\n```sh\nexit 3\n```\n\n```sh\necho 2\n```\n";
    let output = ws.check(markdown, &[]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let err = stderr(&output);
    assert!(err.contains("example=#2 verdict=exited"), "{err}");
    assert!(err.contains("Exited REPL unexpectedly."), "{err}");
    assert_eq!(ws.only_artifact(), "echo 1\n");
}

#[test]
fn slow_example_times_out() {
    let ws = Workspace::new();
    let output = ws.check("```sh\nsleep 5\n```\n", &["--timeout", "0.3"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let err = stderr(&output);
    assert!(
        err.contains("Timeout: either took too long or an error occurred."),
        "{err}"
    );
    assert_eq!(ws.only_artifact(), "");
}

#[test]
fn document_without_examples_passes() {
    let ws = Workspace::new();
    let output = ws.check("# Nothing to run\n\n```python\nprint(1)\n```\n", &[]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("examples=0 passed=0"));
    assert!(ws.artifacts().is_empty());
}

#[test]
fn missing_interpreter_is_invalid() {
    let ws = Workspace::new();
    fs::write(
        ws.path().join("replcheck.toml"),
        "[interpreter]\ncommand = \"replcheck-no-such-interpreter\"\n",
    )
    .expect("write config");
    let output = ws.check("```lisp\n(+ 2 2)\n```\n", &[]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("interpreter startup failed"));
}

#[test]
fn invalid_config_is_invalid() {
    let ws = Workspace::new();
    fs::write(ws.path().join("replcheck.toml"), "eval_timeout_ms = 0\n").expect("write config");
    let output = ws.check("", &[]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("eval_timeout_ms"));
}
