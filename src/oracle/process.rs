use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use super::{OracleError, Transport};
use crate::util::{snippet, SNIPPET_BYTES};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs a local command with the prompt on stdin and reads the reply from
/// stdout. `{model}` in the command template is replaced per call.
pub struct ProcessTransport {
    command: String,
    timeout: Duration,
}

impl ProcessTransport {
    pub fn new(command: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            timeout,
        }
    }

    fn argv(&self, model: &str) -> Result<Vec<String>, OracleError> {
        let args = shell_words::split(&self.command).map_err(|err| {
            OracleError::Other(format!("parse LM command `{}`: {err}", self.command))
        })?;
        if args.is_empty() {
            return Err(OracleError::Other("LM command is empty".to_string()));
        }
        Ok(args
            .into_iter()
            .map(|arg| arg.replace("{model}", model))
            .collect())
    }
}

impl Transport for ProcessTransport {
    fn name(&self) -> &'static str {
        "process"
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, OracleError> {
        let args = self.argv(model)?;
        let program = &args[0];
        if which::which(program).is_err() {
            return Err(OracleError::NotInstalled(program.clone()));
        }

        let mut command = Command::new(program);
        command
            .args(&args[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own group, so the deadline kill reaches anything the command spawns.
            command.process_group(0);
        }
        let mut child = command
            .spawn()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => OracleError::NotInstalled(program.clone()),
                _ => OracleError::Other(format!("spawn {program}: {err}")),
            })?;

        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            thread::spawn(move || stdin.write_all(prompt.as_bytes()))
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        // Pipe threads are detached on timeout; a survivor may keep a pipe open.
        let Some(status) = wait_with_deadline(&mut child, deadline)? else {
            return Err(OracleError::Timeout(self.timeout));
        };
        let (Some(stdout), Some(stderr)) = (collect(stdout, deadline), collect(stderr, deadline))
        else {
            tracing::warn!(
                timeout_secs = self.timeout.as_secs(),
                "LM command exited but its pipes stayed open, killing its group"
            );
            kill_group(&child);
            return Err(OracleError::Timeout(self.timeout));
        };
        if let Some(writer) = writer {
            // A command that exits without reading its input breaks the pipe.
            if let Ok(Err(err)) = writer.join() {
                tracing::debug!(error = %err, "LM command did not consume the whole prompt");
            }
        }

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            if stderr.contains("file does not exist") {
                return Err(OracleError::ModelNotFound(model.to_string()));
            }
            return Err(OracleError::CommandFailed {
                status: status.to_string(),
                stderr: snippet(&stderr, SNIPPET_BYTES),
            });
        }
        let text = String::from_utf8(stdout)
            .map_err(|err| OracleError::Other(format!("decode LM stdout as UTF-8: {err}")))?;
        Ok(text.trim().to_string())
    }
}

fn drain<R: Read + Send + 'static>(mut source: R) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(err) = source.read_to_end(&mut buf) {
            tracing::debug!(error = %err, "LM command pipe read failed");
        }
        let _ = sender.send(buf);
    });
    receiver
}

/// Everything read from a pipe, or `None` when it is still open at `deadline`.
fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(reader) = reader else {
        return Some(Vec::new());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(buf),
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
    }
}

/// Poll until the child exits or `deadline` passes. `None` means the child was
/// killed at the deadline.
fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> Result<Option<ExitStatus>, OracleError> {
    loop {
        let polled = child
            .try_wait()
            .map_err(|err| OracleError::Other(format!("check LM command status: {err}")))?;
        if let Some(status) = polled {
            return Ok(Some(status));
        }
        if Instant::now() > deadline {
            tracing::warn!("LM command timed out, killing it");
            kill(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and, on unix, every process in its group.
fn kill(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

fn kill_group(child: &Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal to the group created at spawn.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = child;
}
