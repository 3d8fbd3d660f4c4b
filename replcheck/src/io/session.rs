//! Interactive interpreter session driven one turn at a time.
//!
//! A turn writes one example's code to the interpreter and then waits for
//! exactly one of three events: the prompt at the start of a line, the end of
//! the output stream, or the per-turn deadline. Background threads read the
//! interpreter's stdout and stderr and forward chunks over a channel so the
//! wait can race incoming data against the deadline.

use std::io::{self, Read, Write};
use std::mem;
use std::ops::Range;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::prompt::PromptMatcher;
use crate::core::types::{Evaluation, Verdict};

/// Abstraction over a live interpreter.
pub trait Repl {
    /// Send `code` and wait for the prompt, end of stream, or the deadline.
    fn evaluate(&mut self, code: &str) -> Result<Evaluation>;
}

/// Parameters for spawning an interpreter session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub command: String,
    pub args: Vec<String>,
    /// Prompt marker, recognized only at the start of a line.
    pub prompt: String,
    pub eval_timeout: Duration,
    pub startup_timeout: Duration,
    /// Time allowed for a clean exit after stdin is closed, before killing.
    pub shutdown_grace: Duration,
}

enum StreamEvent {
    Data(Vec<u8>),
    /// Stdout reached end of stream.
    Closed,
}

/// Where a turn stands while waiting for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnState {
    WaitingForPrompt,
    Matched(Range<usize>),
    Exited,
    TimedOut,
}

/// An interpreter subprocess owned for the duration of a run.
///
/// Dropping the session closes the interpreter's stdin and reaps it, killing
/// it if it does not exit within the grace period.
pub struct ReplSession {
    child: Child,
    stdin: Option<ChildStdin>,
    events: Receiver<StreamEvent>,
    prompt: PromptMatcher,
    /// Output received but not yet attributed to a turn.
    pending: Vec<u8>,
    eval_timeout: Duration,
    shutdown_grace: Duration,
    exited: bool,
    hung: bool,
}

impl ReplSession {
    /// Spawn the interpreter and block until its first prompt.
    ///
    /// Fails if the process cannot be spawned, exits, or stays silent past
    /// `startup_timeout`. No example is evaluated before this succeeds.
    #[instrument(skip_all, fields(command = %request.command))]
    pub fn start(request: &SessionRequest) -> Result<Self> {
        let prompt = PromptMatcher::new(&request.prompt)?;

        let mut cmd = Command::new(&request.command);
        cmd.args(&request.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(args = ?request.args, "spawning interpreter");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn interpreter");
                return Err(e).with_context(|| {
                    format!("interpreter startup failed: spawn {}", request.command)
                });
            }
        };

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let (tx, rx) = mpsc::channel();
        spawn_reader(stdout, tx.clone(), "stdout", true);
        spawn_reader(stderr, tx, "stderr", false);

        let mut session = Self {
            child,
            stdin,
            events: rx,
            prompt,
            pending: Vec::new(),
            eval_timeout: request.eval_timeout,
            shutdown_grace: request.shutdown_grace,
            exited: false,
            hung: false,
        };

        let (state, banner) = session.await_turn(request.startup_timeout);
        let banner = String::from_utf8_lossy(&banner);
        match state {
            TurnState::Matched(_) => {
                debug!(banner = %banner, "interpreter ready");
                Ok(session)
            }
            TurnState::Exited => bail!(
                "interpreter startup failed: {} exited before its first prompt\n{}",
                request.command,
                banner
            ),
            _ => {
                session.hung = true;
                bail!(
                    "interpreter startup failed: no prompt from {} within {:?}\n{}",
                    request.command,
                    request.startup_timeout,
                    banner
                )
            }
        }
    }

    /// Whether the interpreter's output stream has ended.
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    fn send(&mut self, code: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"))?;
        stdin.write_all(code.as_bytes())?;
        if !code.ends_with('\n') {
            stdin.write_all(b"\n")?;
        }
        stdin.flush()
    }

    /// Drop output that arrived after the previous prompt but before this turn's input.
    fn discard_stray_output(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(StreamEvent::Data(bytes)) => self.pending.extend_from_slice(&bytes),
                Ok(StreamEvent::Closed) | Err(TryRecvError::Disconnected) => {
                    self.exited = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        // output after the previous prompt belongs to no turn, even if the
        // interpreter has since exited
        if !self.pending.is_empty() {
            warn!(
                bytes = self.pending.len(),
                output = %String::from_utf8_lossy(&self.pending),
                "discarding output printed after the prompt"
            );
            self.pending.clear();
        }
    }

    /// Wait for the end of a turn and return the bytes that belong to it.
    fn await_turn(&mut self, timeout: Duration) -> (TurnState, Vec<u8>) {
        let deadline = Instant::now() + timeout;
        let mut state = TurnState::WaitingForPrompt;
        while state == TurnState::WaitingForPrompt {
            state = self.advance(deadline);
        }

        let raw = match &state {
            TurnState::Matched(range) => {
                let raw = self.pending[..range.start].to_vec();
                self.pending.drain(..range.end);
                raw
            }
            _ => mem::take(&mut self.pending),
        };
        (state, raw)
    }

    fn advance(&mut self, deadline: Instant) -> TurnState {
        if let Some(range) = self.prompt.find(&self.pending) {
            return TurnState::Matched(range);
        }
        if self.exited {
            return TurnState::Exited;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return TurnState::TimedOut;
        }
        match self.events.recv_timeout(remaining) {
            Ok(StreamEvent::Data(bytes)) => self.pending.extend_from_slice(&bytes),
            Ok(StreamEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                // stderr may still hold the last words of a dying interpreter
                while let Ok(StreamEvent::Data(bytes)) = self.events.try_recv() {
                    self.pending.extend_from_slice(&bytes);
                }
                self.exited = true;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
        TurnState::WaitingForPrompt
    }
}

impl Repl for ReplSession {
    #[instrument(skip_all, fields(code_bytes = code.len()))]
    fn evaluate(&mut self, code: &str) -> Result<Evaluation> {
        self.discard_stray_output();

        if !self.exited
            && let Err(err) = self.send(code)
        {
            if err.kind() != io::ErrorKind::BrokenPipe {
                return Err(err).context("write code to interpreter");
            }
            // the interpreter went away; the wait below sees the end of stream
            debug!("interpreter stdin closed");
            self.stdin = None;
        }

        let (state, raw) = self.await_turn(self.eval_timeout);
        let verdict = match state {
            TurnState::Matched(_) => Verdict::Success,
            TurnState::Exited => Verdict::ProcessExited,
            _ => {
                warn!(
                    timeout_ms = u64::try_from(self.eval_timeout.as_millis()).unwrap_or(u64::MAX),
                    "no prompt before deadline"
                );
                self.hung = true;
                Verdict::Timeout
            }
        };
        debug!(verdict = verdict.label(), raw_bytes = raw.len(), "turn finished");
        Ok(Evaluation { verdict, raw })
    }
}

impl Drop for ReplSession {
    fn drop(&mut self) {
        drop(self.stdin.take());
        let grace = if self.hung {
            Duration::ZERO
        } else {
            self.shutdown_grace
        };
        match self.child.wait_timeout(grace) {
            Ok(Some(status)) => debug!(exit_code = ?status.code(), "interpreter exited"),
            Ok(None) => {
                debug!("interpreter still running, killing");
                kill_and_reap(&mut self.child);
            }
            Err(e) => {
                warn!(err = %e, "wait for interpreter failed, killing");
                kill_and_reap(&mut self.child);
            }
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(err = %e, "kill interpreter");
    }
    if let Err(e) = child.wait() {
        warn!(err = %e, "wait interpreter after kill");
    }
}

/// Forward everything `reader` yields to `tx` until end of stream.
///
/// Only stdout reports `Closed`: the interpreter is considered gone when its
/// primary output stream ends.
fn spawn_reader<R: Read + Send + 'static>(
    mut reader: R,
    tx: Sender<StreamEvent>,
    stream: &'static str,
    reports_close: bool,
) {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(StreamEvent::Data(chunk[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(stream, err = %e, "read interpreter output");
                    break;
                }
            }
        }
        if reports_close {
            let _ = tx.send(StreamEvent::Closed);
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::sh_session_request;

    fn start(eval_timeout: Duration) -> ReplSession {
        ReplSession::start(&sh_session_request(eval_timeout)).expect("start session")
    }

    #[test]
    fn evaluate_captures_output_before_prompt() {
        let mut session = start(Duration::from_secs(5));
        let eval = session.evaluate("echo 4\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"4\n");

        let eval = session.evaluate("echo hello; echo world").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"hello\nworld\n");
    }

    #[test]
    fn prompt_text_inside_a_line_does_not_end_the_turn() {
        let mut session = start(Duration::from_secs(5));
        let eval = session
            .evaluate("echo 'a * b'; sleep 0.2; echo done\n")
            .expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"a * b\ndone\n");
    }

    #[test]
    fn state_persists_between_turns() {
        let mut session = start(Duration::from_secs(5));
        assert!(session.evaluate("x=41\n").expect("set").verdict.is_success());
        let eval = session.evaluate("echo $((x + 1))\n").expect("read");
        assert_eq!(eval.raw, b"42\n");
    }

    #[test]
    fn exit_is_reported_with_preceding_output() {
        let mut session = start(Duration::from_secs(5));
        let eval = session.evaluate("echo bye; exit 3\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::ProcessExited);
        assert_eq!(eval.raw, b"bye\n");
        assert!(session.has_exited());

        let again = session.evaluate("echo 1\n").expect("evaluate");
        assert_eq!(again.verdict, Verdict::ProcessExited);
    }

    #[test]
    fn silence_past_the_deadline_is_a_timeout() {
        let mut session = start(Duration::from_millis(300));
        let started = Instant::now();
        let eval = session.evaluate("echo partial; sleep 3\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Timeout);
        assert_eq!(eval.raw, b"partial\n");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn stderr_is_part_of_the_capture() {
        let mut session = start(Duration::from_secs(5));
        let eval = session.evaluate("echo oops >&2; sleep 0.2\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"oops\n");
    }

    #[test]
    fn output_after_the_prompt_does_not_leak_into_the_next_turn() {
        let mut session = start(Duration::from_secs(5));
        let eval = session.evaluate("printf '1\\n* extra\\n'\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"1\n");

        thread::sleep(Duration::from_millis(300));
        let eval = session.evaluate("echo 2\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"2\n");
    }

    #[test]
    fn prompt_left_over_before_exit_does_not_pass_the_next_example() {
        let mut session = start(Duration::from_secs(5));
        let eval = session
            .evaluate("printf 'a\\n* b\\n* '; exit\n")
            .expect("evaluate");
        assert_eq!(eval.verdict, Verdict::Success);
        assert_eq!(eval.raw, b"a\n");

        thread::sleep(Duration::from_millis(300));
        let eval = session.evaluate("echo never-sent\n").expect("evaluate");
        assert_eq!(eval.verdict, Verdict::ProcessExited);
        assert!(eval.raw.is_empty());
    }

    #[test]
    fn startup_fails_when_interpreter_exits_without_prompt() {
        let mut request = sh_session_request(Duration::from_secs(1));
        request.args = vec!["-c".to_string(), "echo booting; exit 0".to_string()];
        let err = ReplSession::start(&request).err().expect("startup error");
        let message = format!("{err:#}");
        assert!(message.contains("interpreter startup failed"));
        assert!(message.contains("booting"));
    }

    #[test]
    fn startup_fails_when_prompt_never_arrives() {
        let mut request = sh_session_request(Duration::from_secs(1));
        request.args = vec!["-c".to_string(), "sleep 5".to_string()];
        request.startup_timeout = Duration::from_millis(200);
        let err = ReplSession::start(&request).err().expect("startup error");
        assert!(err.to_string().contains("no prompt"));
    }

    #[test]
    fn startup_fails_for_missing_program() {
        let mut request = sh_session_request(Duration::from_secs(1));
        request.command = "replcheck-no-such-interpreter".to_string();
        let err = ReplSession::start(&request).err().expect("startup error");
        assert!(format!("{err:#}").contains("spawn replcheck-no-such-interpreter"));
    }
}
