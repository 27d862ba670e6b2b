//! Lifecycle of one external bot process.
//!
//! A [`BotProcess`] owns the child process and its three standard-stream
//! pipes. Stdout and stderr are pumped by dedicated reader threads into
//! channels, so the match runner can wait on output with a deadline
//! instead of polling the pipes itself.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How long a terminated bot gets to exit on its own before being killed.
const EXIT_GRACE: Duration = Duration::from_millis(100);

/// Failure to start a bot process. Fatal to the whole arena run.
#[derive(Error, Debug)]
#[error("failed to launch bot {seat} ({name}): {source}")]
pub struct LaunchError {
    /// Seat the bot was being launched into.
    pub seat: usize,
    /// Path of the executable.
    pub name: String,
    source: io::Error,
}

/// Outcome of waiting on a bot's output channel.
#[derive(Debug)]
pub enum PipeEvent {
    /// Bytes arrived.
    Data(Vec<u8>),
    /// Nothing arrived within the timeout.
    Idle,
    /// The pipe is exhausted; no further bytes can ever arrive.
    Closed,
}

/// A launched bot and its communication channels.
///
/// Dropping the handle tears the process down on every exit path: stdin is
/// closed as the graceful exit request, the process gets a short grace
/// window, and a still-running child is killed and reaped.
#[derive(Debug)]
pub struct BotProcess {
    /// Seat index within the current game (0 moves first).
    pub seat: usize,
    /// Display name: the path the bot was launched from.
    pub name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_rx: Receiver<io::Result<Vec<u8>>>,
    stderr_rx: Receiver<io::Result<Vec<u8>>>,
    turn_of_death: Option<u32>,
}

/// Forwards raw chunks from a pipe into a channel until EOF or error.
fn pump(mut source: impl Read + Send + 'static, tx: Sender<io::Result<Vec<u8>>>) {
    let mut buf = [0u8; 4096];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

impl BotProcess {
    /// Launches the executable with all three standard streams piped.
    pub fn launch<P: AsRef<Path>>(seat: usize, path: P) -> Result<Self, LaunchError> {
        let name = path.as_ref().display().to_string();
        let mut child = Command::new(path.as_ref())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LaunchError {
                seat,
                name: name.clone(),
                source,
            })?;

        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();

        let (stdout_tx, stdout_rx) = mpsc::channel();
        let (stderr_tx, stderr_rx) = mpsc::channel();
        thread::spawn(move || pump(stdout, stdout_tx));
        thread::spawn(move || pump(stderr, stderr_tx));

        Ok(Self {
            seat,
            name,
            child,
            stdin: Some(stdin),
            stdout_rx,
            stderr_rx,
            turn_of_death: None,
        })
    }

    /// Non-destructive liveness probe.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Turn on which the bot was put down, if it has been.
    pub fn turn_of_death(&self) -> Option<u32> {
        self.turn_of_death
    }

    /// Writes the full payload to the bot's stdin and flushes.
    pub fn feed(&mut self, payload: &str) -> io::Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "bot stdin already closed")
        })?;
        stdin.write_all(payload.as_bytes())?;
        stdin.flush()
    }

    /// Blocks until stdout produces bytes, the timeout lapses, or the pipe
    /// is exhausted.
    ///
    /// A read error on the pipe is folded into [`PipeEvent::Closed`]: either
    /// way no further bytes are coming.
    pub fn wait_stdout(&self, timeout: Duration) -> PipeEvent {
        match self.stdout_rx.recv_timeout(timeout) {
            Ok(Ok(bytes)) => PipeEvent::Data(bytes),
            Ok(Err(_)) | Err(RecvTimeoutError::Disconnected) => PipeEvent::Closed,
            Err(RecvTimeoutError::Timeout) => PipeEvent::Idle,
        }
    }

    /// Empties everything the bot has written to stderr so far.
    ///
    /// Returns the drained text; a read error on the pipe is reported so
    /// the caller can treat it as a protocol failure.
    pub fn drain_stderr(&mut self) -> io::Result<String> {
        let mut out = Vec::new();
        loop {
            match self.stderr_rx.try_recv() {
                Ok(Ok(mut bytes)) => out.append(&mut bytes),
                Ok(Err(e)) => return Err(e),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Puts the bot down and records the turn it died on. Idempotent.
    pub fn terminate(&mut self, turn: u32) {
        if self.turn_of_death.is_none() {
            self.turn_of_death = Some(turn);
        }
        self.shutdown();
    }

    /// Graceful-then-forceful teardown; no-op once the child has exited.
    fn shutdown(&mut self) {
        // Closing stdin is the exit request: a well-behaved bot leaves on EOF.
        self.stdin.take();
        let deadline = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(5));
                }
                _ => break,
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for BotProcess {
    fn drop(&mut self) {
        self.shutdown();
    }
}
