//! Test-only helpers: document tree builders, a scripted interpreter, and a
//! POSIX shell loop that behaves like a prompt-driven REPL.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::document::Node;
use crate::core::types::{Evaluation, Verdict};
use crate::io::session::{Repl, SessionRequest};

/// Shell program that prints `* ` at the start of a line whenever it is ready
/// and evaluates each input line. `exit` ends the session.
pub const SH_REPL: &str = r#"printf '* '
while IFS= read -r line; do
  eval "$line"
  printf '* '
done
"#;

pub fn code(lang: &str, text: &str) -> Node {
    Node::code(lang, text)
}

pub fn blank() -> Node {
    Node::Blank
}

pub fn container(children: Vec<Node>) -> Node {
    Node::container(children)
}

/// A block with no nested blocks, such as a paragraph or heading.
pub fn paragraph() -> Node {
    Node::container(Vec::new())
}

/// Session request that runs [`SH_REPL`] under `sh`.
pub fn sh_session_request(eval_timeout: Duration) -> SessionRequest {
    SessionRequest {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), SH_REPL.to_string()],
        prompt: "* ".to_string(),
        eval_timeout,
        startup_timeout: Duration::from_secs(5),
        shutdown_grace: Duration::from_secs(1),
    }
}

/// One scripted interpreter reply.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    pub verdict: Verdict,
    pub output: String,
}

impl ScriptedTurn {
    pub fn prompt(output: &str) -> Self {
        Self {
            verdict: Verdict::Success,
            output: output.to_string(),
        }
    }

    pub fn exited(output: &str) -> Self {
        Self {
            verdict: Verdict::ProcessExited,
            output: output.to_string(),
        }
    }

    pub fn timeout(output: &str) -> Self {
        Self {
            verdict: Verdict::Timeout,
            output: output.to_string(),
        }
    }
}

/// Interpreter stand-in that replays queued turns and records what it was sent.
#[derive(Debug, Default)]
pub struct ScriptedRepl {
    turns: VecDeque<ScriptedTurn>,
    pub sent: Vec<String>,
}

impl ScriptedRepl {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: turns.into(),
            sent: Vec::new(),
        }
    }
}

impl Repl for ScriptedRepl {
    fn evaluate(&mut self, code: &str) -> Result<Evaluation> {
        self.sent.push(code.to_string());
        let turn = self
            .turns
            .pop_front()
            .ok_or_else(|| anyhow!("scripted repl exhausted"))?;
        Ok(Evaluation {
            verdict: turn.verdict,
            raw: turn.output.into_bytes(),
        })
    }
}
