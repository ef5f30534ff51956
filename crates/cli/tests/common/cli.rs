//! Helpers for running the `treewatch` binary
//!
//! `TwCommand` runs to completion for argument and startup checks;
//! `WatchProcess` keeps the watcher running and reads its stdout lines.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_treewatch"))
}

/// One-shot command builder
pub struct TwCommand {
    args: Vec<String>,
}

impl TwCommand {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Run to completion
    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(binary_path())
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// A running watcher whose stdout is read line by line
pub struct WatchProcess {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl WatchProcess {
    pub fn spawn(args: &[&str]) -> Result<Self> {
        let mut child = Command::new(binary_path())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn treewatch")?;

        let stdout = child.stdout.take().context("stdout not captured")?;
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self { child, lines })
    }

    /// Read lines until one equals `expected` or `timeout` elapses
    pub fn wait_for_line(&self, expected: &str, timeout: Duration) -> Result<Vec<String>> {
        let deadline = Instant::now() + timeout;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    let done = line == expected;
                    seen.push(line);
                    if done {
                        return Ok(seen);
                    }
                }
                Err(_) => anyhow::bail!("Timed out waiting for {:?}; saw {:?}", expected, seen),
            }
        }
    }
}

#[cfg(unix)]
impl WatchProcess {
    /// Ask the watcher to shut down cleanly
    pub fn terminate(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM)
            .context("Failed to send SIGTERM")?;
        Ok(())
    }

    /// Wait for the process to exit, returning its exit code
    ///
    /// `None` if it was killed by a signal.
    pub fn wait_exit(&mut self, timeout: Duration) -> Result<Option<i32>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status.code());
            }
            if Instant::now() >= deadline {
                anyhow::bail!("Process still running after {:?}", timeout);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for WatchProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
