//! Child process execution with a wall-clock timeout.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit checks while a child is running.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output of a finished (or killed) child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Spawn `cmd`, feed `stdin`, and wait at most `timeout`.
///
/// On unix the child leads its own process group. The whole group is killed
/// on expiry, and again once the child has exited, so that grandchildren
/// cannot keep the pipes open.
/// Spawn errors are returned; everything after the spawn is reported in the
/// output.
pub fn run_with_timeout(
    cmd: &mut Command,
    stdin: Option<&str>,
    timeout: Duration,
) -> io::Result<ProcessOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;
    let start = Instant::now();

    let stdin_handle = match (child.stdin.take(), stdin) {
        (Some(mut pipe), Some(input)) => {
            let input = input.to_string();
            Some(thread::spawn(move || {
                // A child that exits without reading closes the pipe early.
                let _ = pipe.write_all(input.as_bytes());
            }))
        }
        _ => None,
    };

    let stdout_handle = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = out.read_to_end(&mut buffer);
            buffer
        })
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = err.read_to_end(&mut buffer);
            buffer
        })
    });

    let mut timed_out = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    tracing::debug!(pid = child.id(), ?timeout, "timeout expired, killing");
                    timed_out = true;
                    kill_process_group(&mut child);
                    break child.wait().ok();
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                tracing::warn!(error = %e, "waiting for child failed");
                kill_process_group(&mut child);
                break child.wait().ok();
            }
        }
    };

    // Background processes left by the child would hold the pipes open.
    kill_process_group(&mut child);

    if let Some(handle) = stdin_handle {
        let _ = handle.join();
    }
    let stdout = stdout_handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();
    let stderr = stderr_handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();

    let exit_code = status.and_then(|s| s.code());
    Ok(ProcessOutput {
        exit_code,
        success: !timed_out && status.is_some_and(|s| s.success()),
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
        timed_out,
    })
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: plain syscall; the child was spawned as leader of group `pid`.
    // ESRCH once the group is empty.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn test_captures_output_and_exit_code() {
        let out = run_with_timeout(
            &mut sh("read -r x || true; echo \"got $x\"; echo oops >&2; exit 3"),
            Some("42"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(out.stdout.trim(), "got 42");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success);
        assert!(!out.timed_out);
    }

    #[test]
    fn test_success_without_stdin() {
        let out = run_with_timeout(&mut sh("echo hi"), None, Duration::from_secs(5)).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, "hi\n");
    }

    #[test]
    fn test_timeout_kills_process_group() {
        let start = Instant::now();
        // The background sleep inherits the pipes; only a group kill frees them.
        let out = run_with_timeout(
            &mut sh("sleep 30 & sleep 30"),
            None,
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(out.timed_out);
        assert!(!out.success);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_background_process_does_not_outlive_child() {
        let start = Instant::now();
        let out = run_with_timeout(
            &mut sh("sleep 30 & echo hi"),
            None,
            Duration::from_millis(300),
        )
        .unwrap();
        assert!(!out.timed_out);
        assert!(out.success);
        assert_eq!(out.stdout, "hi\n");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_spawn_error() {
        let mut cmd = Command::new("/nonexistent/gradecheck-binary");
        assert!(run_with_timeout(&mut cmd, None, Duration::from_secs(1)).is_err());
    }
}
