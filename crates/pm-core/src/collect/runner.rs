//! Package-manager command runner with timeout and output caps.
//!
//! Package managers are run as plain subprocesses with safety controls:
//!
//! - Per-command timeout with SIGTERM → SIGKILL escalation
//! - Output size caps to prevent memory exhaustion
//! - C locale forced so parsers see stable, untranslated output
//!
//! A non-zero exit is NOT an error at this level: several managers use
//! exit codes as data (dnf check-update exits 100 when updates exist).
//! Callers inspect [`CommandOutput::exit_code`] themselves.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, instrument, trace, warn};

/// Default timeout per command in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum output size in bytes (10MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL in milliseconds.
const SIGTERM_GRACE_MS: u64 = 500;

/// Errors that can occur launching a command.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Command that was executed.
    pub program: String,

    /// Arguments passed to the command.
    pub args: Vec<String>,

    /// Standard output (may be truncated).
    pub stdout: Vec<u8>,

    /// Standard error (may be truncated).
    pub stderr: Vec<u8>,

    /// Exit code (if available).
    pub exit_code: Option<i32>,

    /// Whether output was truncated.
    pub truncated: bool,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command hit its deadline and was killed.
    pub timed_out: bool,
}

impl CommandOutput {
    /// Get stdout as string (lossy UTF-8 conversion).
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as string (lossy UTF-8 conversion).
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the command succeeded (exit code 0, no timeout).
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Configuration for the command runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout per command.
    pub timeout: Duration,

    /// Maximum captured output size per stream in bytes.
    pub max_output_bytes: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl RunnerConfig {
    /// Runner config with a specific per-command timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Command runner for package-manager invocations.
///
/// Commands are run sequentially; the package manager itself serializes
/// on its own lock, so parallel probing buys nothing.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    /// Create a new runner with the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// The configured per-command timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Run a command to completion (or timeout), capturing output.
    #[instrument(skip(self), fields(program = %program))]
    pub fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, RunError> {
        let start = Instant::now();

        debug!(
            program,
            ?args,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "running command"
        );

        let mut command = build_command(program, args);

        let mut child = match command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(program, "command not found");
                return Err(RunError::CommandNotFound(program.to_string()));
            }
            Err(e) => {
                error!(program, error = %e, "failed to spawn");
                return Err(RunError::SpawnFailed(e.to_string()));
            }
        };

        let (stdout, stderr, exit_code, truncated, timed_out) =
            self.wait_with_deadline(&mut child)?;

        let duration = start.elapsed();
        debug!(
            program,
            duration_ms = duration.as_millis() as u64,
            exit_code,
            timed_out,
            "command complete"
        );

        Ok(CommandOutput {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            stdout,
            stderr,
            exit_code,
            truncated,
            duration,
            timed_out,
        })
    }

    /// Pump child output until exit or deadline.
    #[allow(clippy::type_complexity)]
    fn wait_with_deadline(
        &self,
        child: &mut Child,
    ) -> Result<(Vec<u8>, Vec<u8>, Option<i32>, bool, bool), RunError> {
        let max_output = self.config.max_output_bytes;
        let deadline = Instant::now() + self.config.timeout;
        let mut stdout_buf = Vec::with_capacity(max_output.min(65536));
        let mut stderr_buf = Vec::with_capacity(max_output.min(65536));
        let mut truncated = false;
        let mut timed_out = false;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let mut chunk = vec![0u8; 8192];

        loop {
            if Instant::now() >= deadline {
                timed_out = true;
                warn!("command hit deadline, sending SIGTERM");
                kill_with_grace(child);
                break;
            }

            let mut did_read = false;

            if let Some(ref mut out) = stdout {
                if let Ok(n) = try_read_nonblocking(out, &mut chunk) {
                    if n > 0 {
                        did_read = true;
                        append_capped(&mut stdout_buf, &chunk[..n], max_output, &mut truncated);
                    }
                }
            }

            if let Some(ref mut err) = stderr {
                if let Ok(n) = try_read_nonblocking(err, &mut chunk) {
                    if n > 0 {
                        did_read = true;
                        append_capped(&mut stderr_buf, &chunk[..n], max_output, &mut truncated);
                    }
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    // Child exited: drain whatever is already buffered in the pipes.
                    if let Some(ref mut out) = stdout {
                        drain_to_limit(out, &mut stdout_buf, max_output, &mut truncated)?;
                    }
                    if let Some(ref mut err) = stderr {
                        drain_to_limit(err, &mut stderr_buf, max_output, &mut truncated)?;
                    }

                    let exit_code = status.code();
                    trace!(?exit_code, "process exited");
                    return Ok((stdout_buf, stderr_buf, exit_code, truncated, timed_out));
                }
                Ok(None) => {
                    if !did_read {
                        // Avoid busy-waiting
                        thread::sleep(Duration::from_millis(10));
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to wait for child");
                    return Err(RunError::Io(e));
                }
            }
        }

        // Timed out - wait for kill to complete
        let status = child.wait().ok();
        let exit_code = status.and_then(|s| s.code());

        Ok((stdout_buf, stderr_buf, exit_code, truncated, timed_out))
    }
}

fn append_capped(buf: &mut Vec<u8>, data: &[u8], max: usize, truncated: &mut bool) {
    let space = max.saturating_sub(buf.len());
    if space > 0 {
        let to_copy = data.len().min(space);
        buf.extend_from_slice(&data[..to_copy]);
        if data.len() > space {
            *truncated = true;
        }
    } else {
        *truncated = true;
    }
}

/// Build the command with a minimal, stable environment.
///
/// LC_ALL=C / LANG=C keep package-manager output untranslated; the
/// parsers depend on the English column layout.
fn build_command(program: &str, args: &[&str]) -> Command {
    let mut command = Command::new(program);
    command.args(args);

    command.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        command.env("PATH", path);
    }
    command.env("LC_ALL", "C");
    command.env("LANG", "C");

    command
}

/// Drain remaining data from a stream up to the limit.
///
/// Uses non-blocking reads to avoid hanging on grandchild processes
/// that may still hold the pipe open after the direct child exits.
#[cfg(unix)]
fn drain_to_limit<R: Read + std::os::unix::io::AsRawFd>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; 8192];
    loop {
        if *truncated {
            break;
        }
        match try_read_nonblocking(stream, &mut chunk) {
            Ok(0) => break, // No more data available
            Ok(n) => append_capped(buf, &chunk[..n], max, truncated),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn drain_to_limit(
    stream: &mut impl Read,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; 8192];
    loop {
        if *truncated {
            break;
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        append_capped(buf, &chunk[..n], max, truncated);
    }
    Ok(())
}

/// Kill a process with SIGTERM, then SIGKILL after a grace period.
#[cfg(unix)]
fn kill_with_grace(child: &mut Child) {
    let pid = child.id() as i32;

    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    debug!(pid, "sent SIGTERM");

    thread::sleep(Duration::from_millis(SIGTERM_GRACE_MS));

    match child.try_wait() {
        Ok(Some(_)) => {
            trace!(pid, "process exited after SIGTERM");
        }
        Ok(None) => {
            warn!(pid, "process did not exit after SIGTERM, sending SIGKILL");
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
            let _ = child.wait();
        }
        Err(e) => {
            error!(pid, error = %e, "failed to check process status");
        }
    }
}

#[cfg(not(unix))]
fn kill_with_grace(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Try to read from a stream without blocking.
///
/// On Unix, this uses fcntl to set O_NONBLOCK on the file descriptor,
/// performs a read, then restores the original flags.
/// Returns Ok(0) if no data is available (EAGAIN/EWOULDBLOCK).
#[cfg(unix)]
fn try_read_nonblocking<R: Read + std::os::unix::io::AsRawFd>(
    stream: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let fd = stream.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let was_nonblocking = (flags & libc::O_NONBLOCK) != 0;
    if !was_nonblocking {
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    let result = stream.read(buf);

    if !was_nonblocking {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, flags);
        }
    }

    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e),
    }
}

/// Non-blocking read fallback for non-Unix platforms.
#[cfg(not(unix))]
fn try_read_nonblocking<R: Read>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    stream.read(buf)
}
