//! Blocking child-process runner with a hard deadline.
//!
//! Every ffmpeg and tesseract invocation goes through [`run_with_timeout`].

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to wait on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

pub fn run_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!("▶️ Running {} (timeout {:?})", program, timeout);

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    // Drained off-thread: a full pipe would stall the child
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                warn!("⏱️ {} exceeded {:?}, killing", program, timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::TimedOut { program, timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(ProcessError::Wait { program, source }),
        }
    };

    let stdout = stdout.map(collect).unwrap_or_default();
    let stderr = stderr.map(collect).unwrap_or_default();

    Ok(ProcessOutput {
        status,
        stdout,
        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_status() {
        let output = run_with_timeout(
            Command::new("sh").args(["-c", "printf hello; printf oops >&2"]),
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, b"hello");
        assert_eq!(output.stderr, "oops");
    }

    #[test]
    fn test_reports_non_zero_exit() {
        let output = run_with_timeout(
            Command::new("sh").args(["-c", "exit 3"]),
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_kills_child_after_deadline() {
        let started = Instant::now();
        let result = run_with_timeout(
            Command::new("sh").args(["-c", "sleep 5"]),
            Duration::from_millis(100),
        );

        assert!(matches!(result, Err(ProcessError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = run_with_timeout(
            &mut Command::new("definitely-not-a-real-binary-7f3a"),
            Duration::from_secs(1),
        );

        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }
}
