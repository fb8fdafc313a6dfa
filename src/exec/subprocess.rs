//! Subprocess execution with streamed output
//!
//! Child stdout/stderr are drained line by line while the process runs so a
//! chatty build tool never blocks on a full pipe.

use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// A program invocation: executable, arguments and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

/// Result of a subprocess execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,

    /// Process exit code; signal terminations map to 128 + signal
    pub exit_code: i32,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    /// Create a CommandResult from an exit status
    pub fn from_status(status: ExitStatus, duration: Duration) -> Self {
        Self {
            success: status.success(),
            exit_code: exit_code_of(status),
            duration,
        }
    }

    #[cfg(test)]
    pub fn from_code(exit_code: i32) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
            duration: Duration::ZERO,
        }
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Runs a command to completion, forwarding its output as it arrives
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult>;
}

/// Spawns real child processes on the tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamingRunner;

impl ProcessRunner for StreamingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let start = Instant::now();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute {}", spec.program))?;

        let stdout = child.stdout.take().context("child stdout was not piped")?;
        let stderr = child.stderr.take().context("child stderr was not piped")?;

        let (status, out, err) = tokio::join!(
            child.wait(),
            drain_lines(stdout, |line| println!("{}", line)),
            drain_lines(stderr, |line| eprintln!("{}", line)),
        );
        out.context("Failed to read child stdout")?;
        err.context("Failed to read child stderr")?;
        let status = status.with_context(|| format!("Failed to wait for {}", spec.program))?;

        Ok(CommandResult::from_status(status, start.elapsed()))
    }
}

/// Read `reader` to EOF, handing each line (without terminator) to `sink`.
///
/// Invalid UTF-8 is replaced rather than treated as an error.
pub async fn drain_lines<R, F>(reader: R, mut sink: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        sink(line.trim_end_matches(|c| c == '\n' || c == '\r'));
    }
}
